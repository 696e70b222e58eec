//! Configure command - push a command template to an inventory

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use netfleet::inventory::Inventory;
use netfleet::orchestrator::FleetOrchestrator;
use netfleet::template::CommandTemplate;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the configure command
#[derive(Parser, Debug, Clone)]
pub struct ConfigureArgs {
    /// Command template, one command per line with {0}, {1}, ... placeholders
    #[arg(short = 't', long)]
    pub template: PathBuf,

    /// Device inventory CSV (device,user,password,<parameters>...)
    #[arg(short = 'i', long)]
    pub inventory: PathBuf,

    /// Write the run log to this file instead of the console
    #[arg(short = 'l', long)]
    pub log: Option<PathBuf>,
}

impl ConfigureArgs {
    /// Execute the configure command
    ///
    /// Device failures are reported and counted but do not change the exit
    /// status; template, inventory and log errors do.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let template = CommandTemplate::from_file(&self.template)?;
        let inventory = Inventory::from_file(&self.inventory)?;
        let orchestrator = FleetOrchestrator::new(ctx.transport(), template, inventory)?;

        let mut reporter = ctx.reporter(self.log.as_deref())?;
        let summary = orchestrator.run(&mut reporter).await?;

        info!(
            total = summary.total,
            skipped = summary.skipped,
            errors = summary.errors,
            "Configure finished"
        );
        Ok(0)
    }
}
