//! Subcommands module for Netfleet CLI

pub mod configure;
pub mod exec;
pub mod facts;

use crate::cli::prompt::{read_password, TerminalPrompt};
use crate::config::Config;
use anyhow::Result;
use netfleet::connection::russh::RusshTransport;
use netfleet::credential::Credential;
use netfleet::reporter::{local_timestamp, Reporter};
use std::path::Path;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration, with CLI overrides applied
    pub config: Config,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, mut config: Config) -> Self {
        if let Some(port) = cli.port {
            config.connection.port = port;
        }
        if let Some(timeout) = cli.timeout {
            config.connection.timeout = timeout;
        }
        if cli.no_color {
            config.output.color = false;
        }
        if !config.output.color {
            colored::control::set_override(false);
        }

        Self { config }
    }

    /// Build the SSH transport
    pub fn transport(&self) -> RusshTransport {
        RusshTransport::new(self.config.connection.clone())
    }

    /// Build the reporter: a log file when one is given, otherwise the console
    pub fn reporter(&self, log: Option<&Path>) -> Result<Reporter> {
        let timestamp = local_timestamp(self.config.logging.timestamp_format.clone())?;
        let log = log.or(self.config.logging.log_file.as_deref());

        let reporter = match log {
            Some(path) => Reporter::log_file(path, &TerminalPrompt)?,
            None => Reporter::console(self.config.output.color),
        };
        Ok(reporter.with_timestamp(timestamp))
    }

    /// Build a credential, prompting for the password when it was not given
    pub fn credential(&self, user: &str, password: Option<&str>) -> Result<Credential> {
        let password = match password {
            Some(p) => p.to_string(),
            None => read_password(user)?,
        };
        Ok(Credential::new(user, password)?)
    }
}
