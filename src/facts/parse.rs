//! Pure extraction of fact fields from status documents.
//!
//! The document shape is decided once per document ([`Topology`]) and per
//! node ([`Packaging`]); each branch is a plain function from elements to
//! fields.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::document::{DocumentError, Element};
use super::{DeviceFacts, FactRecord};

/// Container present only in multi-control-plane replies.
pub const MULTI_ENGINE_RESULTS: &str = "multi-routing-engine-results";

/// One control-plane node's section of a multi-node reply.
pub const MULTI_ENGINE_ITEM: &str = "multi-routing-engine-item";

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*\[(.*)\].*$").expect("valid version regex"));

/// Control-plane layout of a status document.
#[derive(Debug)]
pub enum Topology<'a> {
    /// One implicit node; the element is the document root.
    SingleNode(&'a Element),
    /// Named nodes in document order.
    MultiNode(Vec<(String, &'a Element)>),
}

/// Detect whether a document reports one node or several.
pub fn detect_topology(root: &Element) -> Result<Topology<'_>, DocumentError> {
    let Some(results) = root.find(MULTI_ENGINE_RESULTS) else {
        return Ok(Topology::SingleNode(root));
    };

    let mut nodes = Vec::new();
    for item in results.children(MULTI_ENGINE_ITEM) {
        let name = item
            .child_text("re-name")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DocumentError::new("multi-engine item without a node name"))?;
        nodes.push((name.to_string(), item));
    }

    if nodes.is_empty() {
        return Err(DocumentError::new("multi-engine results contain no nodes"));
    }
    Ok(Topology::MultiNode(nodes))
}

/// How a model family reports its installed software.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packaging {
    /// One package-information element.
    SinglePackage,
    /// A list of package-information elements; the first is authoritative.
    PackageList,
}

impl Packaging {
    /// Select the convention for a product model.
    pub fn for_model(model: &str) -> Self {
        if model.to_ascii_lowercase().starts_with("srx") {
            Packaging::SinglePackage
        } else {
            Packaging::PackageList
        }
    }

    fn package<'a>(&self, info: &'a Element) -> Option<&'a Element> {
        match self {
            Packaging::SinglePackage => info.child("package-information"),
            Packaging::PackageList => info.children("package-information").next(),
        }
    }
}

/// Capture the bracketed token of a package comment.
///
/// ```rust
/// use netfleet::facts::parse::extract_version;
///
/// assert_eq!(extract_version("JUNOS Software Release [20.4R3.8]"), "20.4R3.8");
/// assert_eq!(extract_version("no brackets"), "");
/// ```
pub fn extract_version(comment: &str) -> String {
    VERSION_PATTERN
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Identity fields of one node's `software-information` section.
pub fn software_record(info: &Element) -> FactRecord {
    let model = info.child_text("product-model").unwrap_or_default();
    let package = Packaging::for_model(model).package(info);

    FactRecord {
        host_name: info.child_text("host-name").map(String::from),
        model: Some(model.to_string()).filter(|m| !m.is_empty()),
        software_type: package.and_then(|p| p.child_text("name")).map(String::from),
        software_version: Some(extract_version(
            package.and_then(|p| p.child_text("comment")).unwrap_or_default(),
        )),
        ..Default::default()
    }
}

fn software_section<'a>(node: &'a Element, label: &str) -> Result<&'a Element, DocumentError> {
    node.find("software-information").ok_or_else(|| {
        DocumentError::new(format!("{} has no software-information section", label))
    })
}

/// Build the fact record from a `show version` document.
pub fn parse_version(root: &Element) -> Result<DeviceFacts, DocumentError> {
    match detect_topology(root)? {
        Topology::SingleNode(node) => Ok(DeviceFacts::Single(software_record(
            software_section(node, "document")?,
        ))),
        Topology::MultiNode(nodes) => {
            let mut map = IndexMap::with_capacity(nodes.len());
            for (name, node) in nodes {
                let record = software_record(software_section(node, &name)?);
                map.insert(name, record);
            }
            Ok(DeviceFacts::Multi(map))
        }
    }
}

/// Apply `apply` to each node's record, pairing records with document nodes.
fn merge_nodes<F>(facts: &mut DeviceFacts, root: &Element, mut apply: F) -> Result<(), DocumentError>
where
    F: FnMut(&mut FactRecord, &Element, bool),
{
    match (facts, detect_topology(root)?) {
        (DeviceFacts::Single(record), Topology::SingleNode(node)) => {
            apply(record, node, false);
            Ok(())
        }
        (DeviceFacts::Multi(map), Topology::MultiNode(nodes)) => {
            for (name, node) in nodes {
                if let Some(record) = map.get_mut(&name) {
                    apply(record, node, true);
                }
            }
            Ok(())
        }
        _ => Err(DocumentError::new(
            "node layout differs from the version document",
        )),
    }
}

/// Merge boot, configuration and uptime fields from a `show system uptime`
/// document.
pub fn merge_uptime(facts: &mut DeviceFacts, root: &Element) -> Result<(), DocumentError> {
    merge_nodes(facts, root, |record, node, _| {
        let Some(info) = node.find("system-uptime-information") else {
            return;
        };
        let date = |section: &str| {
            info.path(&[section, "date-time"])
                .map(|e| e.text().to_string())
        };
        record.last_boot = date("system-booted-time");
        record.last_configured = date("last-configured-time");
        record.uptime = info
            .path(&["uptime-information", "up-time"])
            .map(|e| e.text().to_string());
    })
}

/// Merge serial numbers from a `show chassis hardware` document.
///
/// Multi-node chassis report one inventory per node and use its chassis
/// serial. Single-node chassis use the first module that is not a routing
/// engine, falling back to the chassis serial.
pub fn merge_serials(facts: &mut DeviceFacts, root: &Element) -> Result<(), DocumentError> {
    merge_nodes(facts, root, |record, node, multi| {
        let Some(chassis) = node.find("chassis-inventory").and_then(|i| i.child("chassis")) else {
            return;
        };

        let chassis_serial = chassis.child_text("serial-number").map(String::from);
        record.serial = if multi {
            chassis_serial
        } else {
            chassis
                .children("chassis-module")
                .filter(|m| {
                    !m.child_text("name")
                        .unwrap_or_default()
                        .contains("Routing Engine")
                })
                .find_map(|m| m.child_text("serial-number").filter(|s| !s.is_empty()))
                .map(String::from)
                .or(chassis_serial)
        };
    })
}
