//! Connection configuration module
//!
//! Port, timeout and host-key policy for device sessions. There is no retry
//! setting: a device that cannot be reached is recorded as failed and the run
//! moves on.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default connection timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Default SSH port
pub const DEFAULT_PORT: u16 = 22;

/// Session settings shared by every device in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Port for SSH connections
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect and command timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept hosts missing from known_hosts (like StrictHostKeyChecking=accept-new)
    #[serde(default = "default_true")]
    pub accept_unknown_hosts: bool,

    /// Known hosts file path (default: ~/.ssh/known_hosts)
    #[serde(default)]
    pub known_hosts_file: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_true() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            accept_unknown_hosts: true,
            known_hosts_file: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set timeout in seconds
    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Resolve the known_hosts path
    pub fn known_hosts_path(&self) -> Option<PathBuf> {
        self.known_hosts_file
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".ssh").join("known_hosts")))
    }

    /// Split an `address[:port]` target into host and port.
    ///
    /// Bracketed IPv6 (`[::1]:2222`) is supported; a bare IPv6 address keeps
    /// the configured port.
    pub fn resolve_address(&self, address: &str) -> (String, u16) {
        if let Some(rest) = address.strip_prefix('[') {
            if let Some((host, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(self.port);
                return (host.to_string(), port);
            }
        }

        match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => match port.parse() {
                Ok(port) => (host.to_string(), port),
                Err(_) => (address.to_string(), self.port),
            },
            _ => (address.to_string(), self.port),
        }
    }
}
