//! Device fact normalization.
//!
//! Turns a device's `show version` reply (and, in full mode, its uptime and
//! hardware replies) into one canonical record. Single control-plane devices
//! produce a flat [`FactRecord`]; multi control-plane chassis produce a map
//! from node name to record. A reply never yields a mix of the two.
//!
//! # Example
//!
//! ```rust,ignore
//! use netfleet::facts::{FactGatherer, FactsMode};
//!
//! let gatherer = FactGatherer::new(transport);
//! if let Some(facts) = gatherer.gather("edge1", &credential, FactsMode::Full, &mut reporter).await? {
//!     println!("{}", serde_json::to_string_pretty(&facts)?);
//! }
//! ```

pub mod document;
pub mod gather;
pub mod parse;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use document::{DocumentError, Element};
pub use gather::FactGatherer;

/// Command returning the identity and software document.
pub const VERSION_COMMAND: &str = "show version | display xml";

/// Command returning boot and uptime information.
pub const UPTIME_COMMAND: &str = "show system uptime | display xml";

/// Command returning the hardware inventory.
pub const HARDWARE_COMMAND: &str = "show chassis hardware | display xml";

/// Which documents to query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FactsMode {
    /// Identity and software only.
    #[default]
    Basic,
    /// Also boot, uptime and serial number.
    Full,
}

impl FactsMode {
    /// Commands to run, in order.
    pub fn commands(&self) -> &'static [&'static str] {
        match self {
            FactsMode::Basic => &[VERSION_COMMAND],
            FactsMode::Full => &[VERSION_COMMAND, UPTIME_COMMAND, HARDWARE_COMMAND],
        }
    }
}

/// Normalized facts for one device or one control-plane node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FactRecord {
    pub host_name: Option<String>,
    pub model: Option<String>,
    pub software_type: Option<String>,
    pub software_version: Option<String>,
    pub last_boot: Option<String>,
    pub last_configured: Option<String>,
    pub uptime: Option<String>,
    pub serial: Option<String>,
}

impl FactRecord {
    /// Field labels and values, in display order.
    pub fn fields(&self) -> [(&'static str, Option<&str>); 8] {
        [
            ("host-name", self.host_name.as_deref()),
            ("model", self.model.as_deref()),
            ("software-type", self.software_type.as_deref()),
            ("software-version", self.software_version.as_deref()),
            ("last-boot", self.last_boot.as_deref()),
            ("last-configured", self.last_configured.as_deref()),
            ("uptime", self.uptime.as_deref()),
            ("serial", self.serial.as_deref()),
        ]
    }
}

/// Facts for a whole device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceFacts {
    /// Single control-plane device
    Single(FactRecord),
    /// Multi control-plane chassis, keyed by node name
    Multi(IndexMap<String, FactRecord>),
}

impl DeviceFacts {
    /// Whether the device reported more than one control-plane node.
    pub fn is_multi_node(&self) -> bool {
        matches!(self, DeviceFacts::Multi(_))
    }

    /// Render as aligned `label value` lines. Unset fields are left out.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        match self {
            DeviceFacts::Single(record) => write_record(&mut out, record, ""),
            DeviceFacts::Multi(nodes) => {
                for (name, record) in nodes {
                    out.push_str(name);
                    out.push_str(":\n");
                    write_record(&mut out, record, "  ");
                }
            }
        }
        out
    }
}

fn write_record(out: &mut String, record: &FactRecord, indent: &str) {
    for (label, value) in record.fields() {
        if let Some(value) = value {
            out.push_str(&format!("{}{:<18}{}\n", indent, label, value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host: &str) -> FactRecord {
        FactRecord {
            host_name: Some(host.to_string()),
            model: Some("mx960".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_single_serializes_flat() {
        let json = serde_json::to_value(DeviceFacts::Single(record("r1"))).unwrap();
        assert_eq!(json["host-name"], "r1");
        assert!(json["serial"].is_null());
    }

    #[test]
    fn test_multi_serializes_as_map() {
        let mut nodes = IndexMap::new();
        nodes.insert("re0".to_string(), record("r1-re0"));
        nodes.insert("re1".to_string(), record("r1-re1"));
        let json = serde_json::to_value(DeviceFacts::Multi(nodes)).unwrap();
        assert_eq!(json["re0"]["host-name"], "r1-re0");
        assert_eq!(json["re1"]["model"], "mx960");
    }

    #[test]
    fn test_table() {
        let table = DeviceFacts::Single(record("r1")).to_table();
        assert_eq!(
            table,
            "host-name         r1\nmodel             mx960\n"
        );

        let mut nodes = IndexMap::new();
        nodes.insert("re0".to_string(), record("r1"));
        let table = DeviceFacts::Multi(nodes).to_table();
        assert!(table.starts_with("re0:\n  host-name"));
    }

    #[test]
    fn test_mode_commands() {
        assert_eq!(FactsMode::Basic.commands(), &[VERSION_COMMAND]);
        assert_eq!(FactsMode::Full.commands().len(), 3);
    }
}
