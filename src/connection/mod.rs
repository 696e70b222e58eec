//! Connection layer for remote device communication.
//!
//! This module provides the transport boundary used by the execution pipeline
//! and the fact gatherer. A [`Transport`] opens sessions; a [`Connection`] is
//! one live session that executes commands and is closed exactly once.
//!
//! # Supported Transports
//!
//! - **SSH** (via `russh`, default feature): password authentication with
//!   known_hosts verification
//!
//! # Example
//!
//! ```rust,ignore
//! use netfleet::connection::{ConnectionConfig, Transport};
//! use netfleet::connection::russh::RusshTransport;
//! use netfleet::credential::Credential;
//!
//! let transport = RusshTransport::new(ConnectionConfig::default());
//! let credential = Credential::new("netops", "s3cret")?;
//!
//! let session = transport.open("edge1.example.net", &credential).await?;
//! let result = session.execute("show version").await?;
//! println!("Output: {}", result.stdout);
//! session.close().await?;
//! ```

/// Connection configuration types.
pub mod config;

/// Pure Rust SSH implementation using russh.
#[cfg(feature = "russh")]
pub mod russh;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::credential::Credential;

pub use config::ConnectionConfig;

/// Russh-related error type - wraps russh::Error for the client Handler trait
#[cfg(feature = "russh")]
#[derive(Debug)]
pub struct RusshError(pub ::russh::Error);

#[cfg(feature = "russh")]
impl From<::russh::Error> for RusshError {
    fn from(err: ::russh::Error) -> Self {
        RusshError(err)
    }
}

#[cfg(feature = "russh")]
impl std::fmt::Display for RusshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Russh error: {}", self.0)
    }
}

#[cfg(feature = "russh")]
impl std::error::Error for RusshError {}

#[cfg(feature = "russh")]
impl From<::russh::Error> for ConnectionError {
    fn from(err: ::russh::Error) -> Self {
        ConnectionError::SshError(format!("Russh error: {}", err))
    }
}

/// Errors that can occur during connection operations.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish initial connection to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected by the device.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Command execution failed (not to be confused with non-zero exit code).
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),

    /// Connection or operation timed out.
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// The device's host key did not match known_hosts.
    #[error("Host key verification failed for {0}")]
    HostKeyMismatch(String),

    /// SSH-specific error from the underlying implementation.
    #[error("SSH error: {0}")]
    SshError(String),

    /// I/O error during connection operations.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Connection was closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// The result of executing a command on a connection.
///
/// # Example
///
/// ```rust
/// use netfleet::connection::CommandResult;
///
/// let result = CommandResult::success("Hello".into(), String::new());
/// assert!(result.success);
/// assert_eq!(result.exit_code, 0);
///
/// let failed = CommandResult::failure(1, String::new(), "error".into());
/// assert!(!failed.success);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit code of the command (0 typically indicates success).
    pub exit_code: i32,
    /// Content written to standard output.
    pub stdout: String,
    /// Content written to standard error.
    pub stderr: String,
    /// Convenience flag: `true` if `exit_code == 0`.
    pub success: bool,
}

impl CommandResult {
    /// Create a new successful command result
    pub fn success(stdout: String, stderr: String) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr,
            success: true,
        }
    }

    /// Create a new failed command result
    pub fn failure(exit_code: i32, stdout: String, stderr: String) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            success: false,
        }
    }

    /// Get the combined output (stdout + stderr)
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// One live remote command-execution session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the connection identifier (user@host:port)
    fn identifier(&self) -> &str;

    /// Execute a command on the device
    async fn execute(&self, command: &str) -> ConnectionResult<CommandResult>;

    /// Close the session
    async fn close(&self) -> ConnectionResult<()>;
}

/// Opens sessions to devices.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open an authenticated session to `address`.
    async fn open(
        &self,
        address: &str,
        credential: &Credential,
    ) -> ConnectionResult<Box<dyn Connection>>;
}

/// Scoped ownership of an open session.
///
/// [`SessionGuard::release`] closes the session exactly once. If the guard is
/// dropped while still holding the session (a panic or a cancelled future),
/// the close is spawned on the current runtime instead.
pub struct SessionGuard {
    device: String,
    connection: Option<Box<dyn Connection>>,
}

impl SessionGuard {
    /// Take ownership of an open connection.
    pub fn new(device: impl Into<String>, connection: Box<dyn Connection>) -> Self {
        Self {
            device: device.into(),
            connection: Some(connection),
        }
    }

    /// Borrow the session.
    ///
    /// # Panics
    ///
    /// Never in practice: the connection is only taken by `release` or `drop`,
    /// both of which consume the guard.
    pub fn connection(&self) -> &dyn Connection {
        self.connection
            .as_deref()
            .expect("session guard holds a connection until released")
    }

    /// Close the session. Close errors are logged, not returned.
    pub async fn release(mut self) {
        if let Some(connection) = self.connection.take() {
            close_logged(&self.device, connection).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let device = std::mem::take(&mut self.device);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(device = %device, "Session dropped unreleased, closing in background");
                handle.spawn(async move { close_logged(&device, connection).await });
            }
            Err(_) => {
                warn!(device = %device, "Session dropped outside a runtime; closing by drop");
            }
        }
    }
}

async fn close_logged(device: &str, connection: Box<dyn Connection>) {
    match connection.close().await {
        Ok(()) => debug!(device = %device, "Session closed"),
        Err(e) => warn!(device = %device, error = %e, "Failed to close session"),
    }
}
