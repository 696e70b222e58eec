//! Exec command - run ad-hoc commands against one device or a target list

use super::CommandContext;
use anyhow::Result;
use clap::{ArgGroup, Parser};
use netfleet::inventory::load_targets;
use netfleet::pipeline::{CommandSource, ExecutionPipeline};
use std::path::PathBuf;
use tracing::info;

/// Arguments for the exec command
#[derive(Parser, Debug, Clone)]
#[command(group(ArgGroup::new("target").required(true).args(["device", "targets"])))]
#[command(group(ArgGroup::new("source").required(true).args(["command", "command_file"])))]
pub struct ExecArgs {
    /// Single device hostname or address
    #[arg(short = 'd', long)]
    pub device: Option<String>,

    /// File listing one device per line
    #[arg(short = 'T', long)]
    pub targets: Option<PathBuf>,

    /// Command to run
    #[arg(short = 'C', long)]
    pub command: Option<String>,

    /// File listing one command per line
    #[arg(short = 'f', long)]
    pub command_file: Option<PathBuf>,

    /// Login user
    #[arg(short = 'u', long, env = "NETFLEET_USER")]
    pub user: String,

    /// Login password (prompted when omitted)
    #[arg(short = 'P', long, env = "NETFLEET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Write the run log to this file instead of the console
    #[arg(short = 'l', long)]
    pub log: Option<PathBuf>,
}

impl ExecArgs {
    fn source(&self) -> CommandSource {
        match (&self.command, &self.command_file) {
            (Some(command), _) => CommandSource::Inline(command.clone()),
            (None, Some(path)) => CommandSource::File(path.clone()),
            (None, None) => CommandSource::Inline(String::new()),
        }
    }

    fn target_list(&self) -> Result<Vec<String>> {
        match (&self.device, &self.targets) {
            (Some(device), _) => Ok(vec![device.clone()]),
            (None, Some(path)) => Ok(load_targets(path)?),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Execute the exec command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let command = self.source().resolve()?;
        let targets = self.target_list()?;
        let credential = ctx.credential(&self.user, self.password.as_deref())?;

        let pipeline = ExecutionPipeline::new(ctx.transport());
        let mut reporter = ctx.reporter(self.log.as_deref())?;
        let summary = pipeline
            .run_targets(&targets, &credential, &command, &mut reporter)
            .await?;

        info!(
            total = summary.total,
            errors = summary.errors,
            "Exec finished"
        );
        Ok(0)
    }
}
