//! Facts command - gather normalized facts from one device

use super::CommandContext;
use anyhow::Result;
use clap::Parser;
use netfleet::facts::{FactGatherer, FactsMode};

/// Arguments for the facts command
#[derive(Parser, Debug, Clone)]
pub struct FactsArgs {
    /// Device hostname or address
    #[arg(short = 'd', long)]
    pub device: String,

    /// Login user
    #[arg(short = 'u', long, env = "NETFLEET_USER")]
    pub user: String,

    /// Login password (prompted when omitted)
    #[arg(short = 'P', long, env = "NETFLEET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Also gather boot, uptime and serial number
    #[arg(long)]
    pub full: bool,

    /// Print the facts as JSON
    #[arg(long)]
    pub json: bool,
}

impl FactsArgs {
    fn mode(&self) -> FactsMode {
        if self.full {
            FactsMode::Full
        } else {
            FactsMode::Basic
        }
    }

    /// Execute the facts command
    ///
    /// Returns a non-zero exit code when no facts could be gathered.
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let credential = ctx.credential(&self.user, self.password.as_deref())?;
        let gatherer = FactGatherer::new(ctx.transport());
        let mut reporter = ctx.reporter(None)?;

        let facts = if self.json {
            let facts = gatherer
                .gather(&self.device, &credential, self.mode(), &mut reporter)
                .await?;
            if let Some(facts) = &facts {
                println!("{}", serde_json::to_string_pretty(facts)?);
            }
            facts
        } else {
            gatherer
                .display(&self.device, &credential, self.mode(), &mut reporter)
                .await?
        };

        Ok(if facts.is_some() { 0 } else { 3 })
    }
}
