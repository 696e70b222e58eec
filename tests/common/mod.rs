//! Shared test utilities and fixtures for the Netfleet test suite.
//!
//! This module provides:
//! - A scripted mock transport and connection
//! - A shared in-memory writer for reporter output
//! - Inventory and fixture helpers
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use netfleet::connection::{
    CommandResult, Connection, ConnectionError, ConnectionResult, Transport,
};
use netfleet::credential::Credential;
use netfleet::reporter::{Reporter, TimestampFn};

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
struct MockState {
    opened: RwLock<Vec<String>>,
    credentials: RwLock<Vec<String>>,
    executed: RwLock<Vec<(String, String)>>,
    closes: AtomicU32,
    unreachable: RwLock<HashSet<String>>,
    rejecting: RwLock<HashSet<String>>,
    broken: RwLock<HashSet<String>>,
    responses: RwLock<HashMap<(String, String), CommandResult>>,
}

/// A scripted transport that records every session it opens.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport.set_unreachable("edge2");
/// transport.set_response("edge1", "show version", CommandResult::success("ok".into(), "".into()));
///
/// let pipeline = ExecutionPipeline::new(transport.clone());
/// // ... run ...
/// assert_eq!(transport.opened(), vec!["edge1", "edge2"]);
/// assert_eq!(transport.close_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Create a transport where every device is reachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `open` for this device with a connection error.
    pub fn set_unreachable(&self, device: &str) {
        self.state.unreachable.write().insert(device.to_string());
    }

    /// Fail `open` for this device with an authentication error.
    pub fn set_rejecting(&self, device: &str) {
        self.state.rejecting.write().insert(device.to_string());
    }

    /// Fail every `execute` on this device's sessions.
    pub fn set_broken(&self, device: &str) {
        self.state.broken.write().insert(device.to_string());
    }

    /// Script the result of a command on a device.
    pub fn set_response(&self, device: &str, command: &str, result: CommandResult) {
        self.state
            .responses
            .write()
            .insert((device.to_string(), command.to_string()), result);
    }

    /// Devices `open` was called for, in order.
    pub fn opened(&self) -> Vec<String> {
        self.state.opened.read().clone()
    }

    /// Identities presented to `open`, in order.
    pub fn identities(&self) -> Vec<String> {
        self.state.credentials.read().clone()
    }

    /// `(device, command)` pairs executed, in order.
    pub fn executed(&self) -> Vec<(String, String)> {
        self.state.executed.read().clone()
    }

    /// Number of sessions closed.
    pub fn close_count(&self) -> u32 {
        self.state.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        address: &str,
        credential: &Credential,
    ) -> ConnectionResult<Box<dyn Connection>> {
        self.state.opened.write().push(address.to_string());
        self.state
            .credentials
            .write()
            .push(credential.identity().to_string());

        if self.state.unreachable.read().contains(address) {
            return Err(ConnectionError::ConnectionFailed(format!(
                "Failed to connect to {}:22: Connection refused",
                address
            )));
        }
        if self.state.rejecting.read().contains(address) {
            return Err(ConnectionError::AuthenticationFailed(format!(
                "Password rejected for {}@{}",
                credential.identity(),
                address
            )));
        }

        Ok(Box::new(MockConnection {
            identifier: format!("{}@{}:22", credential.identity(), address),
            device: address.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// A session opened by [`MockTransport`].
pub struct MockConnection {
    identifier: String,
    device: String,
    state: Arc<MockState>,
}

#[async_trait]
impl Connection for MockConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn execute(&self, command: &str) -> ConnectionResult<CommandResult> {
        self.state
            .executed
            .write()
            .push((self.device.clone(), command.to_string()));

        if self.state.broken.read().contains(&self.device) {
            return Err(ConnectionError::ExecutionFailed(
                "Failed to open channel: session reset".to_string(),
            ));
        }

        let key = (self.device.clone(), command.to_string());
        let scripted = self.state.responses.read().get(&key).cloned();
        Ok(scripted.unwrap_or_else(|| {
            CommandResult::success(format!("{}: {}\n\n", self.device, command), String::new())
        }))
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Reporter Helpers
// ============================================================================

/// An in-memory writer whose contents stay readable after being boxed.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }

    /// Written lines.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(String::from).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A timestamp function that always returns the same instant.
pub fn fixed_clock() -> TimestampFn {
    Box::new(|| "03/14/2024 9:05:07".to_string())
}

/// An uncolored console reporter writing into a shared buffer.
pub fn buffered_reporter() -> (Reporter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let reporter = Reporter::with_writer(Box::new(buffer.clone()), false).with_timestamp(fixed_clock());
    (reporter, buffer)
}

// ============================================================================
// Fixtures
// ============================================================================

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Read a fixture file.
pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
}

/// A credential for tests.
pub fn credential() -> Credential {
    Credential::new("netops", "s3cret").unwrap()
}
