//! Integration tests for fact gathering and normalization.

mod common;

use common::*;
use netfleet::connection::CommandResult;
use netfleet::facts::parse::parse_version;
use netfleet::facts::{
    DeviceFacts, Element, FactGatherer, FactsMode, HARDWARE_COMMAND, UPTIME_COMMAND,
    VERSION_COMMAND,
};
use netfleet::pipeline::ErrorKind;
use pretty_assertions::assert_eq;

fn reply(xml: String) -> CommandResult {
    CommandResult::success(xml, String::new())
}

fn script(transport: &MockTransport, device: &str, prefix: &str) {
    transport.set_response(
        device,
        VERSION_COMMAND,
        reply(fixture(&format!("{}_version.xml", prefix))),
    );
    transport.set_response(
        device,
        UPTIME_COMMAND,
        reply(fixture(&format!("{}_uptime.xml", prefix))),
    );
    transport.set_response(
        device,
        HARDWARE_COMMAND,
        reply(fixture(&format!("{}_hardware.xml", prefix))),
    );
}

#[test]
fn test_srx_version_is_extracted_from_bracket() {
    let root = Element::parse(&fixture("srx_version.xml")).unwrap();
    let DeviceFacts::Single(record) = parse_version(&root).unwrap() else {
        panic!("expected a flat record");
    };
    assert_eq!(record.model.as_deref(), Some("srx-series"));
    assert_eq!(record.software_version.as_deref(), Some("20.4R3"));
}

#[test]
fn test_multi_engine_document_yields_map() {
    let root = Element::parse(&fixture("mx_version.xml")).unwrap();
    let facts = parse_version(&root).unwrap();

    let DeviceFacts::Multi(nodes) = facts else {
        panic!("expected a node map");
    };
    assert_eq!(
        nodes.keys().cloned().collect::<Vec<_>>(),
        vec!["re0".to_string(), "re1".to_string()]
    );
    assert_eq!(nodes["re0"].host_name.as_deref(), Some("core1-re0"));
    assert_eq!(nodes["re1"].host_name.as_deref(), Some("core1-re1"));
    // First package is authoritative
    assert_eq!(nodes["re0"].software_type.as_deref(), Some("junos"));
    assert_eq!(
        nodes["re0"].software_version.as_deref(),
        Some("20210722.2d7c8e9_builder_stable_12")
    );
}

#[tokio::test]
async fn test_basic_mode_runs_one_command() {
    let transport = MockTransport::new();
    script(&transport, "fw1", "srx");
    let gatherer = FactGatherer::new(transport.clone());

    let facts = gatherer
        .query("fw1", &credential(), FactsMode::Basic)
        .await
        .unwrap();

    assert_eq!(
        transport.executed(),
        vec![("fw1".to_string(), VERSION_COMMAND.to_string())]
    );
    let DeviceFacts::Single(record) = facts else {
        panic!("expected a flat record");
    };
    assert_eq!(record.host_name.as_deref(), Some("fw-branch1"));
    assert_eq!(record.uptime, None);
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test]
async fn test_full_mode_single_node() {
    let transport = MockTransport::new();
    script(&transport, "fw1", "srx");
    let gatherer = FactGatherer::new(transport.clone());

    let facts = gatherer
        .query("fw1", &credential(), FactsMode::Full)
        .await
        .unwrap();

    let json = serde_json::to_value(&facts).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "host-name": "fw-branch1",
            "model": "srx-series",
            "software-type": "junos",
            "software-version": "20.4R3",
            "last-boot": "2024-01-01 00:00:00 UTC",
            "last-configured": "2024-03-13 08:53:20 UTC",
            "uptime": "73 days,  9:05",
            "serial": "BUILTIN"
        })
    );
    // One session for all three documents
    assert_eq!(transport.opened(), vec!["fw1"]);
    assert_eq!(transport.executed().len(), 3);
}

#[tokio::test]
async fn test_full_mode_multi_node() {
    let transport = MockTransport::new();
    script(&transport, "core1", "mx");
    let gatherer = FactGatherer::new(transport);

    let facts = gatherer
        .query("core1", &credential(), FactsMode::Full)
        .await
        .unwrap();

    let DeviceFacts::Multi(nodes) = facts else {
        panic!("expected a node map");
    };
    assert_eq!(nodes["re0"].serial.as_deref(), Some("JN11E2A3BAFA"));
    assert_eq!(nodes["re1"].serial.as_deref(), Some("JN11E2A3BAFB"));
    assert_eq!(
        nodes["re1"].last_boot.as_deref(),
        Some("2024-02-01 04:10:00 UTC")
    );
    assert_eq!(nodes["re0"].uptime.as_deref(), Some("42 days,  5:05"));
}

#[tokio::test]
async fn test_transport_failure_returns_nothing() {
    let transport = MockTransport::new();
    transport.set_rejecting("fw1");
    let gatherer = FactGatherer::new(transport);
    let (mut reporter, buffer) = buffered_reporter();

    let facts = gatherer
        .gather("fw1", &credential(), FactsMode::Full, &mut reporter)
        .await
        .unwrap();

    assert!(facts.is_none());
    assert_eq!(buffer.lines().len(), 2);
}

#[tokio::test]
async fn test_malformed_document_is_a_device_failure() {
    let transport = MockTransport::new();
    transport.set_response(
        "fw1",
        VERSION_COMMAND,
        reply("<rpc-reply><software-information>".to_string()),
    );
    let gatherer = FactGatherer::new(transport.clone());

    let failure = gatherer
        .query("fw1", &credential(), FactsMode::Basic)
        .await
        .unwrap_err();

    assert_eq!(failure.kind, ErrorKind::Document);
    assert!(failure.message.contains("fw1"));
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test]
async fn test_failed_serial_document_discards_whole_record() {
    let transport = MockTransport::new();
    script(&transport, "fw1", "srx");
    transport.set_response(
        "fw1",
        HARDWARE_COMMAND,
        CommandResult::failure(1, String::new(), "error: permission denied".into()),
    );
    let gatherer = FactGatherer::new(transport);
    let (mut reporter, _buffer) = buffered_reporter();

    let facts = gatherer
        .gather("fw1", &credential(), FactsMode::Full, &mut reporter)
        .await
        .unwrap();

    assert!(facts.is_none());
}

#[tokio::test]
async fn test_display_prints_table_and_nothing_on_failure() {
    let transport = MockTransport::new();
    script(&transport, "fw1", "srx");
    transport.set_unreachable("fw2");
    let gatherer = FactGatherer::new(transport);

    let (mut reporter, buffer) = buffered_reporter();
    gatherer
        .display("fw1", &credential(), FactsMode::Basic, &mut reporter)
        .await
        .unwrap();
    assert!(buffer.lines().contains(&"software-version  20.4R3".to_string()));

    let (mut reporter, buffer) = buffered_reporter();
    let facts = gatherer
        .display("fw2", &credential(), FactsMode::Basic, &mut reporter)
        .await
        .unwrap();
    assert!(facts.is_none());
    assert!(!buffer.text().contains("host-name"));
}
