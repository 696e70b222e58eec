//! Integration tests for the fleet orchestrator.

mod common;

use common::*;
use netfleet::connection::CommandResult;
use netfleet::inventory::Inventory;
use netfleet::orchestrator::FleetOrchestrator;
use netfleet::pipeline::ErrorKind;
use netfleet::reporter::{FixedAnswer, Reporter, CONNECTIVITY_FAILURE, CREDENTIAL_HINT};
use netfleet::template::CommandTemplate;
use netfleet::Error;
use pretty_assertions::assert_eq;

fn template(lines: &[&str]) -> CommandTemplate {
    CommandTemplate::from_lines(lines.iter().copied()).unwrap()
}

fn inventory(csv: &str) -> Inventory {
    Inventory::from_csv(csv).unwrap()
}

#[tokio::test]
async fn test_all_reachable_devices_in_order() {
    let transport = MockTransport::new();
    let inv = inventory(
        "device,user,password,vlan\n\
         sw1,netops,pw,100\n\
         sw2,netops,pw,200\n\
         sw3,netops,pw,300\n",
    );
    let orchestrator =
        FleetOrchestrator::new(transport.clone(), template(&["set vlans v{0} vlan-id {0}"]), inv)
            .unwrap();
    let (mut reporter, _buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(summary.errors, 0);
    assert_eq!(summary.attempted, 3);
    assert_eq!(transport.opened(), vec!["sw1", "sw2", "sw3"]);
    assert_eq!(
        transport.executed(),
        vec![
            ("sw1".to_string(), "set vlans v100 vlan-id 100".to_string()),
            ("sw2".to_string(), "set vlans v200 vlan-id 200".to_string()),
            ("sw3".to_string(), "set vlans v300 vlan-id 300".to_string()),
        ]
    );
    assert_eq!(transport.close_count(), 3);
}

#[tokio::test]
async fn test_row_missing_password_is_skipped_not_counted() {
    let transport = MockTransport::new();
    let inv = inventory(
        "device,user,password,vlan\n\
         sw1,netops,pw,100\n\
         sw2,netops,,200\n",
    );
    let orchestrator =
        FleetOrchestrator::new(transport.clone(), template(&["set vlans v{0}"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(transport.opened(), vec!["sw1"]);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.errors, 0);

    let skips: Vec<_> = buffer
        .lines()
        .into_iter()
        .filter(|l| l.contains("Skipping sw2"))
        .collect();
    assert_eq!(skips.len(), 1);
    assert!(skips[0].ends_with("no password"));
}

#[tokio::test]
async fn test_missing_user_and_device_rows_are_skipped() {
    let transport = MockTransport::new();
    let inv = inventory(
        "device,user,password\n\
         ,netops,pw\n\
         sw2,,pw\n\
         sw3,netops,pw\n",
    );
    let orchestrator =
        FleetOrchestrator::new(transport.clone(), template(&["show version"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(transport.opened(), vec!["sw3"]);
    assert_eq!(summary.skipped, 2);
    assert!(buffer.text().contains("Skipping line 2: no device"));
    assert!(buffer.text().contains("Skipping sw2: no user"));
}

#[tokio::test]
async fn test_failures_are_isolated_and_counted() {
    let transport = MockTransport::new();
    transport.set_unreachable("sw1");
    transport.set_rejecting("sw2");
    let inv = inventory(
        "device,user,password\n\
         sw1,netops,pw\n\
         sw2,netops,pw\n\
         sw3,netops,pw\n",
    );
    let orchestrator =
        FleetOrchestrator::new(transport.clone(), template(&["show version"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(summary.errors, 2);
    assert_eq!(transport.opened(), vec!["sw1", "sw2", "sw3"]);
    assert_eq!(summary.results[0].error, Some(ErrorKind::Connect));
    assert_eq!(summary.results[1].error, Some(ErrorKind::Auth));
    assert!(summary.results[2].succeeded);
    // Only the session that opened is closed
    assert_eq!(transport.close_count(), 1);

    let text = buffer.text();
    assert_eq!(text.matches(CONNECTIVITY_FAILURE).count(), 2);
    assert_eq!(text.matches(CREDENTIAL_HINT).count(), 2);
    assert!(buffer
        .lines()
        .last()
        .unwrap()
        .contains("Completed with 2 error(s)"));
}

#[tokio::test]
async fn test_remote_exit_status_is_a_failure_with_output() {
    let transport = MockTransport::new();
    transport.set_response(
        "sw1",
        "set vlans v100",
        CommandResult::failure(1, "error: syntax error\n".into(), String::new()),
    );
    let inv = inventory("device,user,password,vlan\nsw1,netops,pw,100\n");
    let orchestrator =
        FleetOrchestrator::new(transport.clone(), template(&["set vlans v{0}"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.results[0].error, Some(ErrorKind::RemoteExit(1)));
    assert_eq!(summary.results[0].raw_output, "error: syntax error");
    assert!(buffer.text().contains("error: syntax error\n"));
    assert_eq!(transport.close_count(), 1);
}

#[tokio::test]
async fn test_progress_percentages_are_reported() {
    let transport = MockTransport::new();
    let inv = inventory(
        "device,user,password\n\
         a,u,p\n\
         b,u,p\n\
         c,u,p\n",
    );
    let orchestrator =
        FleetOrchestrator::new(transport, template(&["show version"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    orchestrator.run(&mut reporter).await.unwrap();

    let text = buffer.text();
    assert!(text.contains("Configuring a (1 of 3, 33%)"));
    assert!(text.contains("Configuring b (2 of 3, 67%)"));
    assert!(text.contains("Configuring c (3 of 3, 100%)"));
}

#[tokio::test]
async fn test_output_is_trimmed_before_reporting() {
    let transport = MockTransport::new();
    let inv = inventory("device,user,password\nsw1,u,p\n");
    let orchestrator =
        FleetOrchestrator::new(transport, template(&["show version"]), inv).unwrap();
    let (mut reporter, buffer) = buffered_reporter();

    let summary = orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(summary.results[0].raw_output, "sw1: show version");
    assert!(buffer.lines().contains(&"sw1: show version".to_string()));
}

#[test]
fn test_placeholder_mismatch_is_fatal_before_any_session() {
    let transport = MockTransport::new();
    let inv = inventory("device,user,password,vlan\nsw1,u,p,100\n");

    let result = FleetOrchestrator::new(
        transport.clone(),
        template(&["set vlans v{0} interface {1}"]),
        inv,
    );

    assert!(matches!(
        result,
        Err(Error::PlaceholderMismatch {
            placeholders: 2,
            parameters: 1
        })
    ));
    assert!(transport.opened().is_empty());
}

#[tokio::test]
async fn test_static_template_ignores_parameter_columns() {
    let transport = MockTransport::new();
    let inv = inventory("device,user,password,site\nsw1,u,p,dc1\n");
    let orchestrator = FleetOrchestrator::new(
        transport.clone(),
        template(&["show version", "show chassis alarms"]),
        inv,
    )
    .unwrap();
    let (mut reporter, _buffer) = buffered_reporter();

    orchestrator.run(&mut reporter).await.unwrap();

    assert_eq!(
        transport.executed(),
        vec![(
            "sw1".to_string(),
            "show version; show chassis alarms".to_string()
        )]
    );
}

#[tokio::test]
async fn test_log_file_summary_points_at_log() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("configure.log");

    let transport = MockTransport::new();
    transport.set_unreachable("sw1");
    let inv = inventory("device,user,password\nsw1,u,p\n");
    let orchestrator =
        FleetOrchestrator::new(transport, template(&["show version"]), inv).unwrap();
    let mut reporter = Reporter::log_file(&log, &FixedAnswer(false))
        .unwrap()
        .with_timestamp(fixed_clock());

    let summary = orchestrator.run(&mut reporter).await.unwrap();
    assert_eq!(summary.errors, 1);

    let content = std::fs::read_to_string(&log).unwrap();
    let last = content.lines().last().unwrap();
    assert!(last.starts_with("[03/14/2024 9:05:07] Completed with 1 error(s); see "));
    assert!(last.contains("configure.log"));
}
