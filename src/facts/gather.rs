//! Fact gathering over a live session.

use tracing::{debug, info, warn};

use super::document::Element;
use super::parse::{merge_serials, merge_uptime, parse_version};
use super::{DeviceFacts, FactsMode};
use crate::connection::{CommandResult, Transport};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::pipeline::{DeviceFailure, ErrorKind, ExecutionPipeline};
use crate::reporter::Reporter;

/// Queries a device's status documents and normalizes them.
pub struct FactGatherer<T: Transport> {
    pipeline: ExecutionPipeline<T>,
}

impl<T: Transport> FactGatherer<T> {
    /// Create a gatherer over a transport.
    pub fn new(transport: T) -> Self {
        Self {
            pipeline: ExecutionPipeline::new(transport),
        }
    }

    /// Query and normalize one device's facts.
    ///
    /// All documents are fetched in one session. Any transport failure or
    /// unparseable document fails the whole query; no partial record is
    /// returned.
    pub async fn query(
        &self,
        device: &str,
        credential: &Credential,
        mode: FactsMode,
    ) -> std::result::Result<DeviceFacts, DeviceFailure> {
        let replies = self
            .pipeline
            .run_session(device, credential, mode.commands())
            .await?;

        normalize(device, &replies).map_err(|e| DeviceFailure {
            kind: ErrorKind::Document,
            message: e.to_string(),
            output: String::new(),
        })
    }

    /// Query a device, reporting a failure with the standard two-line message.
    ///
    /// Returns `Ok(None)` when the device failed.
    pub async fn gather(
        &self,
        device: &str,
        credential: &Credential,
        mode: FactsMode,
        reporter: &mut Reporter,
    ) -> Result<Option<DeviceFacts>> {
        match self.query(device, credential, mode).await {
            Ok(facts) => {
                info!(device = %device, multi_node = facts.is_multi_node(), "Gathered facts");
                Ok(Some(facts))
            }
            Err(failure) => {
                warn!(device = %device, kind = %failure.kind, "Fact query failed");
                reporter.device_failure(device, &failure.message)?;
                Ok(None)
            }
        }
    }

    /// Gather and print a device's facts as a table. Prints nothing on failure.
    pub async fn display(
        &self,
        device: &str,
        credential: &Credential,
        mode: FactsMode,
        reporter: &mut Reporter,
    ) -> Result<Option<DeviceFacts>> {
        let facts = self.gather(device, credential, mode, reporter).await?;
        if let Some(facts) = &facts {
            reporter.content(facts.to_table().trim_end())?;
        }
        Ok(facts)
    }
}

fn normalize(device: &str, replies: &[CommandResult]) -> Result<DeviceFacts> {
    let mut documents = replies.iter().map(|reply| {
        Element::parse(&reply.stdout).map_err(|e| Error::document(device, e.to_string()))
    });

    let version = documents
        .next()
        .ok_or_else(|| Error::document(device, "no version document returned"))??;
    let mut facts = parse_version(&version).map_err(|e| Error::document(device, e.to_string()))?;

    if let Some(uptime) = documents.next() {
        merge_uptime(&mut facts, &uptime?).map_err(|e| Error::document(device, e.to_string()))?;
    }
    if let Some(hardware) = documents.next() {
        merge_serials(&mut facts, &hardware?)
            .map_err(|e| Error::document(device, e.to_string()))?;
    }

    debug!(device = %device, "Normalized status documents");
    Ok(facts)
}
