//! Error types for Netfleet.
//!
//! This module defines the error types used throughout Netfleet. Errors fall in
//! two families: run-level failures that stop a run before any device is
//! touched, and per-device failures that are recorded and counted but never
//! propagate past the orchestrator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Netfleet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Netfleet.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Template Errors
    // ========================================================================
    /// Error loading a command template.
    #[error("Failed to load command template '{path}': {message}")]
    TemplateLoad {
        /// Path to the template file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template placeholders do not line up with the inventory parameters.
    #[error(
        "Template expects {placeholders} parameter(s) but the inventory provides {parameters}"
    )]
    PlaceholderMismatch {
        /// Number of parameters the template references
        placeholders: usize,
        /// Number of parameter columns available
        parameters: usize,
    },

    /// Malformed placeholder in a template line.
    #[error("Invalid placeholder on template line {line}: {message}")]
    InvalidPlaceholder {
        /// 1-based template line
        line: usize,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Inventory Errors
    // ========================================================================
    /// Error loading inventory.
    #[error("Failed to load inventory from '{path}': {message}")]
    InventoryLoad {
        /// Path to inventory
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Inventory header does not start with the fixed columns.
    #[error("Invalid inventory header: {0}")]
    InventoryHeader(String),

    /// Error loading a target list.
    #[error("Failed to load target list from '{path}': {message}")]
    TargetListLoad {
        /// Path to the target list
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Credential Errors
    // ========================================================================
    /// A credential was requested without a secret.
    #[error("No secret supplied for user '{0}'")]
    MissingSecret(String),

    /// A credential was requested without an identity.
    #[error("No user supplied for credential")]
    MissingIdentity,

    // ========================================================================
    // Command Source Errors
    // ========================================================================
    /// Error reading a command list file.
    #[error("Failed to read command file '{path}': {message}")]
    CommandFile {
        /// Path to the command file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Device Errors
    // ========================================================================
    /// Connection-level failure against a device.
    #[error("Device '{device}' failed: {source}")]
    Device {
        /// Target device
        device: String,
        /// Underlying transport error
        #[source]
        source: crate::connection::ConnectionError,
    },

    /// Status document could not be parsed.
    #[error("Malformed status document from '{device}': {message}")]
    Document {
        /// Target device
        device: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Reporter Errors
    // ========================================================================
    /// Log artifact could not be opened or written.
    #[error("Log file error for '{path}': {source}")]
    LogFile {
        /// Log destination
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    /// Status-line timestamp format with an unknown or incomplete specifier.
    #[error("Invalid timestamp format '{0}'")]
    TimestampFormat(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new inventory load error.
    pub fn inventory_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InventoryLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new template load error.
    pub fn template_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::TemplateLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new device error.
    pub fn device(device: impl Into<String>, source: crate::connection::ConnectionError) -> Self {
        Self::Device {
            device: device.into(),
            source,
        }
    }

    /// Creates a new document error.
    pub fn document(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Document {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error must stop a run before any device is touched.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Device { .. } | Error::Document { .. })
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Device { .. } | Error::Document { .. } => 3,
            Error::TemplateLoad { .. }
            | Error::PlaceholderMismatch { .. }
            | Error::InvalidPlaceholder { .. }
            | Error::CommandFile { .. } => 4,
            Error::InventoryLoad { .. }
            | Error::InventoryHeader(_)
            | Error::TargetListLoad { .. } => 5,
            Error::MissingSecret(_) | Error::MissingIdentity => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}
