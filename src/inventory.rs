//! Device inventory.
//!
//! The inventory is a header-bearing CSV file. Its first three columns are
//! fixed as `device`, `user` and `password`; every further column is a
//! positional template parameter, in column order:
//!
//! ```text
//! device,user,password,vlan,port
//! edge1.example.net,netops,s3cret,120,ge-0/0/4
//! edge2.example.net,netops,s3cret,130,ge-0/0/7
//! ```
//!
//! The header is validated once at load time and every row must carry the
//! same number of columns. Rows without a user or password are kept but
//! flagged so the orchestrator can skip them without attempting a session.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::credential::{Credential, SensitiveString};
use crate::error::{Error, Result};

/// The fixed leading columns of every inventory.
pub const FIXED_COLUMNS: [&str; 3] = ["device", "user", "password"];

/// One device's connection and template-parameter data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRow {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    /// Hostname or address.
    pub device: String,
    /// Login user, if present.
    pub user: Option<String>,
    /// Login password, if present.
    pub password: Option<SensitiveString>,
    /// Template parameters, in column order.
    pub params: Vec<String>,
}

/// Why a row cannot be attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The `device` column is empty.
    MissingDevice,
    /// The `user` column is empty.
    MissingUser,
    /// The `password` column is empty.
    MissingPassword,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingDevice => write!(f, "no device"),
            SkipReason::MissingUser => write!(f, "no user"),
            SkipReason::MissingPassword => write!(f, "no password"),
        }
    }
}

impl InventoryRow {
    /// Build the credential for this row, or say why the row is skipped.
    pub fn credential(&self) -> std::result::Result<Credential, SkipReason> {
        if self.device.is_empty() {
            return Err(SkipReason::MissingDevice);
        }
        let user = self.user.as_deref().ok_or(SkipReason::MissingUser)?;
        let password = self.password.clone().ok_or(SkipReason::MissingPassword)?;
        Credential::from_secured(user, password).map_err(|e| match e {
            Error::MissingIdentity => SkipReason::MissingUser,
            _ => SkipReason::MissingPassword,
        })
    }
}

/// A parsed device inventory.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Source file, when loaded from disk.
    pub source: Option<PathBuf>,
    header: Vec<String>,
    rows: Vec<InventoryRow>,
}

impl Inventory {
    /// Load an inventory from a CSV file.
    ///
    /// A missing or unreadable file, a bad header, or a row with the wrong
    /// column count fails the whole load; no partial inventory is returned.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::inventory_load(path, e.to_string()))?;

        let mut inventory = Self::from_csv(&content).map_err(|e| match e {
            Error::InventoryLoad { message, .. } => Error::inventory_load(path, message),
            other => other,
        })?;
        inventory.source = Some(path.to_path_buf());

        debug!(
            path = %path.display(),
            rows = inventory.len(),
            parameters = inventory.parameter_width(),
            "Loaded inventory"
        );
        Ok(inventory)
    }

    /// Parse an inventory from CSV text.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::Headers)
            .from_reader(content.as_bytes());

        let header: Vec<String> = reader
            .headers()
            .map_err(|e| Error::inventory_load("<inline>", e.to_string()))?
            .iter()
            .map(String::from)
            .collect();
        validate_header(&header)?;

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::inventory_load("<inline>", e.to_string()))?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);

            // Passwords are taken verbatim; every other field is trimmed
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
            let password = record.get(2).unwrap_or("");

            rows.push(InventoryRow {
                line,
                device: field(0),
                user: non_empty(field(1)),
                password: non_empty(password.to_string()).map(SensitiveString::new),
                params: record
                    .iter()
                    .skip(FIXED_COLUMNS.len())
                    .map(|p| p.trim().to_string())
                    .collect(),
            });
        }

        Ok(Self {
            source: None,
            header,
            rows,
        })
    }

    /// Names of the parameter columns.
    pub fn parameter_names(&self) -> &[String] {
        &self.header[FIXED_COLUMNS.len()..]
    }

    /// Number of parameter columns after the fixed prefix.
    pub fn parameter_width(&self) -> usize {
        self.header.len().saturating_sub(FIXED_COLUMNS.len())
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[InventoryRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the inventory has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn validate_header(header: &[String]) -> Result<()> {
    if header.len() < FIXED_COLUMNS.len() {
        return Err(Error::InventoryHeader(format!(
            "expected at least {} columns ({}), found {}",
            FIXED_COLUMNS.len(),
            FIXED_COLUMNS.join(","),
            header.len()
        )));
    }

    for (i, expected) in FIXED_COLUMNS.iter().enumerate() {
        if !header[i].eq_ignore_ascii_case(expected) {
            return Err(Error::InventoryHeader(format!(
                "column {} must be '{}', found '{}'",
                i + 1,
                expected,
                header[i]
            )));
        }
    }

    Ok(())
}

/// Load a target list: one hostname or address per line.
///
/// Blank lines and `#` comments are ignored.
pub fn load_targets(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::TargetListLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(parse_targets(&content))
}

/// Parse target-list text.
pub fn parse_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}
