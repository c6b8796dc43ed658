//! Orchestrator tests against in-memory sessions

use std::sync::Arc;

use fortivault::storage::registry::{Device, DeviceRegistry};

use crate::fakes::{orchestrator, FakeConnector, CONFIG_DUMP, SYSTEM_STATUS};

#[tokio::test]
async fn test_backup_one_writes_both_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let connector = Arc::new(FakeConnector::default());
    let orchestrator = orchestrator(connector.clone(), tmp.path());

    let mut device = Device::new("fw1", "10.0.0.1", "admin", "secret");
    device.vdom = "dmz".to_string();

    let result = orchestrator.backup_one(&device).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.artifacts.len(), 2);
    assert_eq!(result.retained_configs, 1);
    assert_eq!(connector.closed_count(), 1);

    let config = std::fs::read_to_string(&result.artifacts[0]).unwrap();
    assert!(result.artifacts[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("fw1_config_"));
    assert!(config.starts_with("# FortiGate configuration backup\n"));
    assert!(config.contains("# Device: fw1 (10.0.0.1)\n"));
    assert!(config.contains("# VDOM: dmz\n"));
    assert!(config.ends_with(CONFIG_DUMP));

    let system = std::fs::read_to_string(&result.artifacts[1]).unwrap();
    assert!(system.contains("==================== SYSTEM_STATUS ===================="));
    assert!(system.contains(SYSTEM_STATUS));
    assert!(system.contains("HA Health Status: OK"));
    // Failed diagnostics are left out
    assert!(!system.contains("ARP_TABLE"));
}

#[tokio::test]
async fn test_missing_username_fails_without_connecting() {
    let tmp = tempfile::tempdir().unwrap();
    let connector = Arc::new(FakeConnector::default());
    let orchestrator = orchestrator(connector.clone(), tmp.path());

    let registry = DeviceRegistry::parse(
        r#"{"devices": [
            {"name": "fw1", "host": "10.0.0.1", "username": "admin", "password": "pw"},
            {"name": "fw2", "host": "10.0.0.2", "password": "pw"}
        ]}"#,
    )
    .unwrap();

    let summary = orchestrator.backup_all(&registry).await;

    assert_eq!(summary.total(), 2);
    assert_eq!(summary.success_count + summary.failure_count, 2);
    assert!(summary.get("fw1").unwrap().success);

    let fw2 = summary.get("fw2").unwrap();
    assert!(!fw2.success);
    assert!(fw2.error.as_deref().unwrap().contains("username"));
    assert_eq!(connector.opened_hosts(), vec!["10.0.0.1".to_string()]);
}

#[tokio::test]
async fn test_one_device_failure_does_not_stop_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let connector = Arc::new(FakeConnector {
        refused: vec!["10.0.0.2".to_string()],
        broken: vec!["10.0.0.3".to_string()],
        ..Default::default()
    });
    let orchestrator = orchestrator(connector.clone(), tmp.path());

    let registry = DeviceRegistry::new(vec![
        Device::new("fw1", "10.0.0.1", "admin", "pw"),
        Device::new("fw2", "10.0.0.2", "admin", "pw"),
        Device::new("fw3", "10.0.0.3", "admin", "pw"),
        Device::new("fw4", "10.0.0.4", "admin", "pw"),
    ]);

    let summary = orchestrator.backup_all(&registry).await;

    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.failure_count, 2);
    assert!(summary.get("fw4").unwrap().success);
    assert!(summary
        .get("fw2")
        .unwrap()
        .error
        .as_deref()
        .unwrap()
        .contains("connection refused"));

    // fw2 never opened a session; the other three were all released
    assert_eq!(connector.opened_hosts().len(), 4);
    assert_eq!(connector.closed_count(), 3);

    // No artifact for the device whose dump failed
    let names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert!(!names.iter().any(|n| n.starts_with("fw3_")));
    assert!(!names.iter().any(|n| n.starts_with("fw2_")));
    assert!(names.iter().any(|n| n.starts_with("fw1_config_")));
}

#[tokio::test]
async fn test_empty_registry_yields_empty_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator(Arc::new(FakeConnector::default()), tmp.path());

    let summary = orchestrator.backup_all(&DeviceRegistry::default()).await;

    assert_eq!(summary.total(), 0);
    assert_eq!(summary.success_count + summary.failure_count, 0);
}
