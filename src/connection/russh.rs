//! Russh connection module
//!
//! SSH sessions to network devices using the russh crate. Devices are
//! authenticated with the inventory password; each command runs on its own
//! exec channel of one session.

use async_trait::async_trait;
use russh::client::{Handle, Handler};
use russh::keys::key::PublicKey;
use russh::ChannelMsg;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use super::config::ConnectionConfig;
use super::{
    CommandResult, Connection, ConnectionError, ConnectionResult, RusshError, Transport,
};
use crate::credential::Credential;

/// Result of host key verification
#[derive(Debug, Clone, PartialEq)]
enum HostKeyStatus {
    /// Key matches known_hosts entry
    Verified,
    /// Host not found in known_hosts (first connection)
    Unknown,
    /// Key doesn't match known_hosts entry
    Mismatch,
}

/// A parsed entry from known_hosts file
#[derive(Debug, Clone)]
struct KnownHostEntry {
    /// Hostnames/patterns this entry applies to
    patterns: Vec<String>,
    /// The public key
    key: PublicKey,
}

/// Client handler for russh with host key verification
struct ClientHandler {
    host: String,
    port: u16,
    known_hosts: Arc<Vec<KnownHostEntry>>,
    accept_unknown: bool,
}

impl ClientHandler {
    /// A host may have one line per key type; any matching key verifies it.
    fn verify_host_key(&self, server_key: &PublicKey) -> HostKeyStatus {
        let fingerprint = server_key.fingerprint();
        let mut host_known = false;

        for entry in self.known_hosts.iter() {
            if !entry
                .patterns
                .iter()
                .any(|pattern| pattern_matches(pattern, &self.host, self.port))
            {
                continue;
            }
            if entry.key.fingerprint() == fingerprint {
                return HostKeyStatus::Verified;
            }
            host_known = true;
        }

        if host_known {
            HostKeyStatus::Mismatch
        } else {
            HostKeyStatus::Unknown
        }
    }
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = RusshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.verify_host_key(server_public_key) {
            HostKeyStatus::Verified => {
                debug!(host = %self.host, "Host key verified against known_hosts");
                Ok(true)
            }
            HostKeyStatus::Unknown if self.accept_unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, accepting");
                Ok(true)
            }
            HostKeyStatus::Unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, rejecting");
                Ok(false)
            }
            HostKeyStatus::Mismatch => {
                warn!(
                    host = %self.host,
                    "HOST KEY VERIFICATION FAILED! Server key does not match known_hosts entry."
                );
                Ok(false)
            }
        }
    }
}

/// Load and parse a known_hosts file. Unreadable files yield no entries.
fn load_known_hosts(path: Option<&Path>) -> Vec<KnownHostEntry> {
    let Some(path) = path.filter(|p| p.exists()) else {
        return Vec::new();
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Failed to read known_hosts file");
            return Vec::new();
        }
    };

    let entries: Vec<_> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_known_hosts_line)
        .collect();

    debug!(entry_count = %entries.len(), "Loaded known_hosts entries");
    entries
}

/// Parse a single line from known_hosts: `host[,host...] keytype base64key [comment]`
fn parse_known_hosts_line(line: &str) -> Option<KnownHostEntry> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }

    let patterns = parts[0].split(',').map(String::from).collect();
    let key_bytes =
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, parts[2]).ok()?;

    match russh::keys::key::parse_public_key(&key_bytes, None) {
        Ok(key) => Some(KnownHostEntry { patterns, key }),
        Err(_) => {
            trace!(key_type = %parts[1], "Failed to parse key, skipping entry");
            None
        }
    }
}

/// Check if a known_hosts pattern matches the host
fn pattern_matches(pattern: &str, host: &str, port: u16) -> bool {
    if let Some(hashed) = pattern.strip_prefix("|1|") {
        return hashed_host_matches(hashed, &lookup_name(host, port));
    }

    // [host]:port form
    if let Some(rest) = pattern.strip_prefix('[') {
        if let Some((pattern_host, tail)) = rest.split_once(']') {
            let pattern_port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(22);
            return pattern_host == host && pattern_port == port;
        }
    }

    if port == 22 && pattern == host {
        return true;
    }

    if pattern.contains('*') || pattern.contains('?') {
        return wildcard_match(pattern, host);
    }

    false
}

/// Name a host is stored under: `host` on port 22, `[host]:port` otherwise
fn lookup_name(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

/// Match a hashed `salt|hash` pattern (the part after `|1|`)
fn hashed_host_matches(hashed: &str, name: &str) -> bool {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let Some((salt, hash)) = hashed.split_once('|') else {
        return false;
    };
    match (STANDARD.decode(salt), STANDARD.decode(hash)) {
        (Ok(salt), Ok(hash)) => hmac_sha1(&salt, name.as_bytes()).as_slice() == hash.as_slice(),
        _ => false,
    }
}

/// HMAC-SHA1 as used by OpenSSH for hashed known_hosts names
fn hmac_sha1(key: &[u8], message: &[u8]) -> [u8; 20] {
    use sha1::{Digest, Sha1};

    const BLOCK_SIZE: usize = 64;

    let mut key_block = [0u8; BLOCK_SIZE];
    if key.len() > BLOCK_SIZE {
        key_block[..20].copy_from_slice(&Sha1::digest(key));
    } else {
        key_block[..key.len()].copy_from_slice(key);
    }

    let mut inner = Sha1::new();
    inner.update(key_block.map(|b| b ^ 0x36));
    inner.update(message);

    let mut outer = Sha1::new();
    outer.update(key_block.map(|b| b ^ 0x5c));
    outer.update(inner.finalize());
    outer.finalize().into()
}

/// Simple wildcard matching for known_hosts patterns
fn wildcard_match(pattern: &str, text: &str) -> bool {
    match pattern.chars().next() {
        None => text.is_empty(),
        Some('*') => {
            let rest = &pattern[1..];
            (0..=text.len())
                .filter(|&i| text.is_char_boundary(i))
                .any(|i| wildcard_match(rest, &text[i..]))
        }
        Some(pc) => {
            let mut text_chars = text.chars();
            match text_chars.next() {
                Some(tc) if pc == '?' || pc == tc => {
                    wildcard_match(&pattern[pc.len_utf8()..], text_chars.as_str())
                }
                _ => false,
            }
        }
    }
}

/// Opens password-authenticated SSH sessions.
pub struct RusshTransport {
    config: ConnectionConfig,
    known_hosts: Arc<Vec<KnownHostEntry>>,
}

impl RusshTransport {
    /// Create a transport, loading known_hosts once for the whole run
    pub fn new(config: ConnectionConfig) -> Self {
        let known_hosts = load_known_hosts(config.known_hosts_path().as_deref());
        Self {
            config,
            known_hosts: Arc::new(known_hosts),
        }
    }

    fn client_config(timeout: Duration) -> Arc<russh::client::Config> {
        let config = russh::client::Config {
            inactivity_timeout: Some(timeout),
            ..Default::default()
        };
        Arc::new(config)
    }
}

#[async_trait]
impl Transport for RusshTransport {
    async fn open(
        &self,
        address: &str,
        credential: &Credential,
    ) -> ConnectionResult<Box<dyn Connection>> {
        let (host, port) = self.config.resolve_address(address);
        let timeout = self.config.timeout_duration();
        let user = credential.identity();

        debug!(host = %host, port = %port, user = %user, "Connecting via SSH (russh)");

        let addr = format!("{}:{}", host, port);
        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))?
            .map_err(|e| {
                ConnectionError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;

        socket.set_nodelay(true).map_err(|e| {
            ConnectionError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        let handler = ClientHandler {
            host: host.clone(),
            port,
            known_hosts: Arc::clone(&self.known_hosts),
            accept_unknown: self.config.accept_unknown_hosts,
        };

        let mut session = tokio::time::timeout(
            timeout,
            russh::client::connect_stream(Self::client_config(timeout), socket, handler),
        )
        .await
        .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))?
        .map_err(|e| match e.0 {
            russh::Error::UnknownKey => ConnectionError::HostKeyMismatch(host.clone()),
            other => ConnectionError::ConnectionFailed(format!("SSH handshake failed: {}", other)),
        })?;

        let authenticated = session
            .authenticate_password(user, credential.secret().expose())
            .await
            .map_err(|e| {
                ConnectionError::AuthenticationFailed(format!(
                    "Password authentication failed: {}",
                    e
                ))
            })?;

        if !authenticated {
            return Err(ConnectionError::AuthenticationFailed(format!(
                "Password rejected for {}@{}",
                user, host
            )));
        }

        let identifier = format!("{}@{}:{}", user, host, port);
        debug!(identifier = %identifier, "SSH connection established");

        Ok(Box::new(RusshConnection {
            identifier,
            handle: RwLock::new(Some(session)),
            timeout,
        }))
    }
}

/// One authenticated russh session
pub struct RusshConnection {
    identifier: String,
    handle: RwLock<Option<Handle<ClientHandler>>>,
    timeout: Duration,
}

impl RusshConnection {
    async fn run_channel(&self, command: &str) -> ConnectionResult<CommandResult> {
        let handle_guard = self.handle.read().await;
        let handle = handle_guard
            .as_ref()
            .ok_or(ConnectionError::ConnectionClosed)?;

        let mut channel = handle.channel_open_session().await.map_err(|e| {
            ConnectionError::ExecutionFailed(format!("Failed to open channel: {}", e))
        })?;
        drop(handle_guard);

        channel.exec(true, command).await.map_err(|e| {
            ConnectionError::ExecutionFailed(format!("Failed to execute command: {}", e))
        })?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                // Extended data type 1 is stderr
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status),
                ChannelMsg::Close => break,
                _ => {}
            }
        }

        let _ = channel.eof().await;

        // i32::MAX marks an exit status the device never reported
        let exit_code: i32 = exit_code.map(|e| e as i32).unwrap_or(i32::MAX);
        let stdout = String::from_utf8_lossy(&stdout).to_string();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        trace!(exit_code = %exit_code, "Command completed");

        if exit_code == 0 {
            Ok(CommandResult::success(stdout, stderr))
        } else {
            Ok(CommandResult::failure(exit_code, stdout, stderr))
        }
    }
}

#[async_trait]
impl Connection for RusshConnection {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn execute(&self, command: &str) -> ConnectionResult<CommandResult> {
        trace!(identifier = %self.identifier, command = %command, "Executing remote command");

        match tokio::time::timeout(self.timeout, self.run_channel(command)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn close(&self) -> ConnectionResult<()> {
        debug!(identifier = %self.identifier, "Closing SSH connection");

        let handle = self.handle.write().await.take();
        if let Some(handle) = handle {
            handle
                .disconnect(
                    russh::Disconnect::ByApplication,
                    "Connection closed by client",
                    "en",
                )
                .await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RusshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshConnection")
            .field("identifier", &self.identifier)
            .field("timeout", &self.timeout)
            .finish()
    }
}
