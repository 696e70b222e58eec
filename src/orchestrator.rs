//! Fleet orchestration.
//!
//! Drives the execution pipeline once per inventory row, strictly in order.
//! Rows without credentials are skipped with a warning, failed devices are
//! reported and counted, and the run always reaches the last row.

use tracing::{debug, info, instrument};

use crate::connection::Transport;
use crate::error::Result;
use crate::inventory::Inventory;
use crate::pipeline::{report_result, report_summary, ExecutionPipeline, RunSummary};
use crate::reporter::Reporter;
use crate::template::CommandTemplate;

/// Position and error count of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position of the current row
    pub current: usize,
    /// Number of rows
    pub total: usize,
    /// Failed devices so far
    pub errors: usize,
}

impl Progress {
    /// Whole-number completion percentage, `round(current / total * 100)`.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((self.current as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// Pushes a command template to every device of an inventory.
pub struct FleetOrchestrator<T: Transport> {
    pipeline: ExecutionPipeline<T>,
    template: CommandTemplate,
    inventory: Inventory,
}

impl<T: Transport> FleetOrchestrator<T> {
    /// Create an orchestrator.
    ///
    /// Fails if the template's placeholders do not fit the inventory's
    /// parameter columns; no device is touched in that case.
    pub fn new(transport: T, template: CommandTemplate, inventory: Inventory) -> Result<Self> {
        template.validate_width(inventory.parameter_width())?;
        Ok(Self {
            pipeline: ExecutionPipeline::new(transport),
            template,
            inventory,
        })
    }

    /// Run the template against every row.
    ///
    /// Only reporter failures are returned as errors; device failures are
    /// recorded in the summary.
    #[instrument(skip_all, fields(rows = self.inventory.len()))]
    pub async fn run(&self, reporter: &mut Reporter) -> Result<RunSummary> {
        let rows = self.inventory.rows();
        let mut progress = Progress {
            total: rows.len(),
            ..Default::default()
        };
        let mut summary = RunSummary {
            total: rows.len(),
            ..Default::default()
        };

        info!(
            total = progress.total,
            parameters = ?self.inventory.parameter_names(),
            "Starting fleet run"
        );

        for (idx, row) in rows.iter().enumerate() {
            progress.current = idx + 1;

            let credential = match row.credential() {
                Ok(credential) => credential,
                Err(reason) => {
                    let name = if row.device.is_empty() {
                        format!("line {}", row.line)
                    } else {
                        row.device.clone()
                    };
                    reporter.warn(format!("Skipping {}: {}", name, reason))?;
                    summary.skipped += 1;
                    continue;
                }
            };

            reporter.status(format!(
                "Configuring {} ({} of {}, {}%)",
                row.device,
                progress.current,
                progress.total,
                progress.percent()
            ))?;

            let command = self.template.render(&row.params)?;
            debug!(device = %row.device, current = progress.current, "Rendered command");

            let result = self
                .pipeline
                .run_device(&row.device, &credential, &command)
                .await;
            report_result(reporter, &result)?;
            summary.record(result);
            progress.errors = summary.errors;
        }

        info!(
            attempted = summary.attempted,
            skipped = summary.skipped,
            errors = progress.errors,
            "Fleet run finished"
        );
        report_summary(reporter, progress.errors)?;
        Ok(summary)
    }
}
