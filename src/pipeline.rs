//! Per-device execution pipeline.
//!
//! One invocation opens a session, runs its commands, captures the output and
//! releases the session on every exit path:
//!
//! ```text
//! open ─ok─▶ execute ─ok─▶ success ─▶ release
//!   │           └──err──▶ failure ─▶ release
//!   └──err──▶ failure
//! ```
//!
//! Failures are returned as values ([`ExecutionResult`] with an
//! [`ErrorKind`]); they never propagate out of a multi-target run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::connection::{CommandResult, ConnectionError, SessionGuard, Transport};
use crate::credential::Credential;
use crate::error::{Error, Result};
use crate::reporter::Reporter;
use crate::template::{join_commands, read_command_lines};

// ============================================================================
// Command Sources
// ============================================================================

/// Where a command comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSource {
    /// A command string executed as-is.
    Inline(String),
    /// A line-oriented command list, joined with the template separator.
    File(PathBuf),
}

impl CommandSource {
    /// Produce the command string to execute.
    pub fn resolve(&self) -> Result<String> {
        match self {
            CommandSource::Inline(command) => Ok(command.clone()),
            CommandSource::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| Error::CommandFile {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                let lines = read_command_lines(&content);
                if lines.is_empty() {
                    return Err(Error::CommandFile {
                        path: path.clone(),
                        message: "command file contains no commands".to_string(),
                    });
                }
                Ok(join_commands(&lines))
            }
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Category of a per-device failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The device could not be reached.
    Connect,
    /// The device rejected the credential or host key.
    Auth,
    /// Connect or command timed out.
    Timeout,
    /// The session broke while running a command.
    Execution,
    /// The command ran and reported a non-zero exit status.
    RemoteExit(i32),
    /// The returned status document could not be understood.
    Document,
}

impl ErrorKind {
    /// Classify a transport error.
    pub fn from_connection(err: &ConnectionError) -> Self {
        match err {
            ConnectionError::ConnectionFailed(_) => ErrorKind::Connect,
            ConnectionError::AuthenticationFailed(_) | ConnectionError::HostKeyMismatch(_) => {
                ErrorKind::Auth
            }
            ConnectionError::Timeout(_) => ErrorKind::Timeout,
            ConnectionError::ExecutionFailed(_)
            | ConnectionError::SshError(_)
            | ConnectionError::IoError(_)
            | ConnectionError::ConnectionClosed => ErrorKind::Execution,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connect => write!(f, "connection failed"),
            ErrorKind::Auth => write!(f, "authentication failed"),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::Execution => write!(f, "execution failed"),
            ErrorKind::RemoteExit(code) => write!(f, "exited with status {}", code),
            ErrorKind::Document => write!(f, "malformed status document"),
        }
    }
}

/// Outcome of one device's pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Target device
    pub device: String,
    /// Captured output, trailing whitespace removed
    pub raw_output: String,
    /// Whether every stage completed
    pub succeeded: bool,
    /// Failure category, when not succeeded
    pub error: Option<ErrorKind>,
    /// Human-readable failure detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExecutionResult {
    fn success(device: &str, raw_output: String) -> Self {
        Self {
            device: device.to_string(),
            raw_output,
            succeeded: true,
            error: None,
            detail: None,
        }
    }

    fn failure(device: &str, raw_output: String, kind: ErrorKind, detail: String) -> Self {
        Self {
            device: device.to_string(),
            raw_output,
            succeeded: false,
            error: Some(kind),
            detail: Some(detail),
        }
    }
}

/// A session-level failure: category plus message.
#[derive(Debug)]
pub struct DeviceFailure {
    /// Failure category
    pub kind: ErrorKind,
    /// Failure message
    pub message: String,
    /// Output captured before the failure, if any
    pub output: String,
}

impl DeviceFailure {
    fn from_connection(device: &str, err: ConnectionError) -> Self {
        let kind = ErrorKind::from_connection(&err);
        Self {
            kind,
            message: Error::device(device, err).to_string(),
            output: String::new(),
        }
    }
}

impl fmt::Display for DeviceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Counters and results of a multi-device run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Devices in the run
    pub total: usize,
    /// Devices a session was attempted for
    pub attempted: usize,
    /// Devices skipped without a session
    pub skipped: usize,
    /// Devices that failed
    pub errors: usize,
    /// Per-device results, in run order
    pub results: Vec<ExecutionResult>,
}

impl RunSummary {
    /// Whether every attempted device succeeded.
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }

    /// Record one device result.
    pub fn record(&mut self, result: ExecutionResult) {
        self.attempted += 1;
        if !result.succeeded {
            self.errors += 1;
        }
        self.results.push(result);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs commands against one device at a time over a [`Transport`].
pub struct ExecutionPipeline<T: Transport> {
    transport: T,
}

impl<T: Transport> ExecutionPipeline<T> {
    /// Create a pipeline over a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Run each command in order within one session.
    ///
    /// Stops at the first command that fails or exits non-zero. The session is
    /// released before this returns, whatever the outcome.
    pub async fn run_session(
        &self,
        device: &str,
        credential: &Credential,
        commands: &[&str],
    ) -> std::result::Result<Vec<CommandResult>, DeviceFailure> {
        debug!(device = %device, commands = commands.len(), "Opening session");

        let connection = self
            .transport
            .open(device, credential)
            .await
            .map_err(|e| DeviceFailure::from_connection(device, e))?;
        let guard = SessionGuard::new(device, connection);
        debug!(device = %device, session = %guard.connection().identifier(), "Session opened");

        let outcome = execute_all(&guard, device, commands).await;
        guard.release().await;
        outcome
    }

    /// Run one command against one device.
    pub async fn run_device(
        &self,
        device: &str,
        credential: &Credential,
        command: &str,
    ) -> ExecutionResult {
        match self.run_session(device, credential, &[command]).await {
            Ok(results) => {
                let output = results
                    .first()
                    .map(CommandResult::combined_output)
                    .unwrap_or_default();
                info!(device = %device, "Command completed");
                ExecutionResult::success(device, output.trim_end().to_string())
            }
            Err(failure) => {
                warn!(device = %device, error = %failure, "Device failed");
                ExecutionResult::failure(
                    device,
                    failure.output.trim_end().to_string(),
                    failure.kind,
                    failure.message,
                )
            }
        }
    }

    /// Run one command against each target in order, reusing one credential.
    ///
    /// Per-target failures are reported and counted; the run always continues.
    pub async fn run_targets(
        &self,
        targets: &[String],
        credential: &Credential,
        command: &str,
        reporter: &mut Reporter,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary {
            total: targets.len(),
            ..Default::default()
        };

        for (idx, target) in targets.iter().enumerate() {
            reporter.status(format!(
                "Connecting to {} ({} of {})",
                target,
                idx + 1,
                targets.len()
            ))?;

            let result = self.run_device(target, credential, command).await;
            report_result(reporter, &result)?;
            summary.record(result);
        }

        report_summary(reporter, summary.errors)?;
        Ok(summary)
    }
}

async fn execute_all(
    guard: &SessionGuard,
    device: &str,
    commands: &[&str],
) -> std::result::Result<Vec<CommandResult>, DeviceFailure> {
    let mut results = Vec::with_capacity(commands.len());

    for command in commands {
        let result = guard
            .connection()
            .execute(command)
            .await
            .map_err(|e| DeviceFailure::from_connection(device, e))?;

        if !result.success {
            return Err(DeviceFailure {
                kind: ErrorKind::RemoteExit(result.exit_code),
                message: format!(
                    "Device '{}' command exited with status {}: {}",
                    device,
                    result.exit_code,
                    result.stderr.trim_end()
                ),
                output: result.combined_output(),
            });
        }
        results.push(result);
    }

    Ok(results)
}

/// Write a device's output, or its failure message, to the reporter.
pub(crate) fn report_result(reporter: &mut Reporter, result: &ExecutionResult) -> Result<()> {
    reporter.content(&result.raw_output)?;
    if !result.succeeded {
        let detail = result.detail.as_deref().unwrap_or_default();
        reporter.device_failure(&result.device, detail)?;
    }
    Ok(())
}

/// Write the closing summary line.
pub(crate) fn report_summary(reporter: &mut Reporter, errors: usize) -> Result<()> {
    let destination = reporter.log_destination().map(|p| p.to_path_buf());
    match (errors, destination) {
        (0, _) => reporter.status("Completed with 0 error(s)"),
        (n, Some(path)) => reporter.error(format!(
            "Completed with {} error(s); see {} for details",
            n,
            path.display()
        )),
        (n, None) => reporter.error(format!(
            "Completed with {} error(s); see the messages above for details",
            n
        )),
    }
}
