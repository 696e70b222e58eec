//! CLI module for Netfleet
//!
//! Argument parsing and subcommand dispatch. The subcommands are thin: they
//! load inputs, build the transport and reporter, and hand off to the library.

pub mod commands;
pub mod prompt;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Netfleet - bulk command execution for Junos fleets
#[derive(Parser, Debug, Clone)]
#[command(name = "netfleet")]
#[command(author = "Netfleet Contributors")]
#[command(version)]
#[command(about = "Push command templates, run commands and gather facts across network devices", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "NETFLEET_CONFIG")]
    pub config: Option<PathBuf>,

    /// SSH port (overrides configuration)
    #[arg(short = 'p', long, global = true)]
    pub port: Option<u16>,

    /// Connect and command timeout in seconds (overrides configuration)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Push a command template to every device in an inventory
    Configure(commands::configure::ConfigureArgs),

    /// Run a command against one device or a target list
    Exec(commands::exec::ExecArgs),

    /// Gather normalized facts from one device
    Facts(commands::facts::FactsArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
