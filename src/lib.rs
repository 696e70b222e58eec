//! # Netfleet - Bulk Command Execution for Junos Fleets
//!
//! Netfleet pushes parameterized command templates to many network devices
//! over SSH, runs ad-hoc commands against one device or a target list, and
//! normalizes each device's self-reported status into one canonical fact
//! record.
//!
//! ## Core Concepts
//!
//! - **Inventory**: CSV rows with a fixed `device,user,password` prefix and a
//!   positional parameter tail
//! - **Templates**: command lines with `{0}`, `{1}`, ... placeholders
//! - **Pipeline**: one session per device, released on every exit path
//! - **Orchestrator**: drives the pipeline across an inventory, isolating
//!   failures per device
//! - **Reporter**: timestamped status lines to the console or a log file
//! - **Facts**: single- or multi-node fact records from `show version` and
//!   friends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CLI Interface                         │
//! │              configure  │  exec  │  facts                     │
//! └──────────────────────────────────────────────────────────────┘
//!          │                    │                 │
//!          ▼                    │                 ▼
//! ┌──────────────────┐          │        ┌──────────────────┐
//! │ FleetOrchestrator│          │        │   FactGatherer   │
//! │ inventory+template          │        │ document → facts │
//! └──────────────────┘          │        └──────────────────┘
//!          │                    ▼                 │
//!          └──────────▶ ExecutionPipeline ◀───────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │            Transport / Connection (russh over SSH)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use netfleet::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let template = CommandTemplate::from_file("vlans.txt")?;
//!     let inventory = Inventory::from_file("switches.csv")?;
//!     let transport = RusshTransport::new(ConnectionConfig::default());
//!
//!     let orchestrator = FleetOrchestrator::new(transport, template, inventory)?;
//!     let mut reporter = Reporter::console(true);
//!     let summary = orchestrator.run(&mut reporter).await?;
//!     println!("{} error(s)", summary.errors);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Connection types
    #[cfg(feature = "russh")]
    pub use crate::connection::russh::{RusshConnection, RusshTransport};
    pub use crate::connection::{
        CommandResult, Connection, ConnectionConfig, ConnectionError, ConnectionResult,
        SessionGuard, Transport,
    };

    // Error handling
    pub use crate::error::{Error, ErrorContext, Result};

    // Inputs
    pub use crate::credential::{Credential, SensitiveString};
    pub use crate::inventory::{Inventory, InventoryRow, SkipReason};
    pub use crate::template::CommandTemplate;

    // Execution
    pub use crate::orchestrator::{FleetOrchestrator, Progress};
    pub use crate::pipeline::{
        CommandSource, ErrorKind, ExecutionPipeline, ExecutionResult, RunSummary,
    };
    pub use crate::reporter::{OverwritePrompt, Reporter};

    // Facts
    pub use crate::facts::{DeviceFacts, FactGatherer, FactRecord, FactsMode};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Credentials and redacting secret strings.
pub mod credential;

// ============================================================================
// Inputs
// ============================================================================

/// Device inventory and target lists.
///
/// The inventory is a CSV file whose first three columns are `device`,
/// `user` and `password`; the remaining columns feed template placeholders.
pub mod inventory;

/// Positional command templates.
pub mod template;

// ============================================================================
// Infrastructure
// ============================================================================

/// Transport boundary and SSH sessions.
pub mod connection;

/// Timestamped run output to the console or a log file.
pub mod reporter;

// ============================================================================
// Execution Engine
// ============================================================================

/// Per-device execution with guaranteed session release.
pub mod pipeline;

/// Inventory-wide template runs.
pub mod orchestrator;

/// Status document parsing and fact normalization.
pub mod facts;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
