//! Full-cycle tests: backup, report, delivery and retention

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fortivault::app::cycle::BackupCycle;
use fortivault::filesys::file::File;
use fortivault::models::backup::RunStatus;
use fortivault::notify::telegram::Notifier;
use fortivault::retention::sweeper::RetentionSweeper;

use crate::fakes::{orchestrator, FakeConnector, RecordingNotifier};

const REGISTRY: &str = r#"{"devices": [
    {"name": "fw1", "host": "10.0.0.1", "username": "admin", "password": "pw", "vdom": "edge"},
    {"name": "fw2", "host": "10.0.0.2", "password": "pw"}
]}"#;

struct Fixture {
    _tmp: tempfile::TempDir,
    backup_dir: std::path::PathBuf,
    registry_path: std::path::PathBuf,
    connector: Arc<FakeConnector>,
}

impl Fixture {
    fn new(registry: Option<&str>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let backup_dir = tmp.path().join("backups");
        fs::create_dir_all(&backup_dir).unwrap();

        let registry_path = tmp.path().join("devices.json");
        if let Some(contents) = registry {
            fs::write(&registry_path, contents).unwrap();
        }

        Self {
            _tmp: tmp,
            backup_dir,
            registry_path,
            connector: Arc::new(FakeConnector::default()),
        }
    }

    fn cycle(&self, notifier: Option<Arc<dyn Notifier>>) -> BackupCycle {
        BackupCycle::new(
            File::new(&self.registry_path),
            orchestrator(self.connector.clone(), &self.backup_dir),
            RetentionSweeper::new(30),
            notifier,
        )
    }
}

fn touch_old(path: &Path, age_days: u64) {
    fs::write(path, "old").unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(age_days * 24 * 60 * 60))
        .unwrap();
}

#[tokio::test]
async fn test_partial_run_is_reported_and_delivered() {
    let fixture = Fixture::new(Some(REGISTRY));
    for day in 1..=3 {
        let name = format!("fw1_config_2026010{}_020000.conf", day);
        fs::write(fixture.backup_dir.join(name), "older").unwrap();
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let outcome = cycle.run_cycle().await.unwrap();

    assert_eq!(outcome.status, RunStatus::Partial);
    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.failure_count, 1);
    assert!(outcome.notified);
    assert!(outcome.finished_at >= outcome.started_at);
    assert_eq!(fixture.connector.opened_hosts(), vec!["10.0.0.1".to_string()]);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("⚠️ <b>FortiGate Backup - Partial</b>"));
    // Three older configs plus the one just written
    assert!(messages[0].contains("• fw1 (4 files)"));
    assert!(messages[0].contains("• fw2"));
    assert_eq!(outcome.report, messages[0]);

    let contents = fs::read_dir(&fixture.backup_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().map(|e| e == "conf").unwrap_or(false))
        .map(|p| fs::read_to_string(p).unwrap())
        .find(|c| c != "older")
        .unwrap();
    assert!(contents.contains("# Device: fw1 (10.0.0.1)"));
    assert!(contents.contains("# VDOM: edge"));
}

#[tokio::test]
async fn test_badly_typed_entry_does_not_block_other_devices() {
    let fixture = Fixture::new(Some(
        r#"{"devices": [
            {"name": "fw1", "host": "10.0.0.1", "username": "admin", "password": "pw"},
            {"name": "fw2", "host": "10.0.0.2", "port": "22", "username": "admin", "password": "pw"},
            {"name": "fw3", "host": "10.0.0.3", "username": "admin", "password": "pw"}
        ]}"#,
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let outcome = cycle.run_cycle().await.unwrap();

    assert_eq!(outcome.status, RunStatus::Partial);
    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.failure_count, 1);
    assert_eq!(
        fixture.connector.opened_hosts(),
        vec!["10.0.0.1".to_string(), "10.0.0.3".to_string()]
    );
    assert!(notifier.messages()[0].contains("❌ <b>Failed devices:</b>\n• fw2"));
}

#[tokio::test]
async fn test_missing_registry_aborts_before_any_work() {
    let fixture = Fixture::new(None);
    touch_old(&fixture.backup_dir.join("fw1_config_20200101_000000.conf"), 90);
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let err = cycle.run_cycle().await.unwrap_err();

    assert!(err.is_fatal());
    assert!(notifier.messages().is_empty());
    assert!(fixture.connector.opened_hosts().is_empty());
    // Sweep did not run either
    assert!(fixture
        .backup_dir
        .join("fw1_config_20200101_000000.conf")
        .exists());
}

#[tokio::test]
async fn test_empty_registry_sends_nothing() {
    let fixture = Fixture::new(Some(r#"{"devices": []}"#));
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let outcome = cycle.run_cycle().await.unwrap();

    assert_eq!(outcome.status, RunStatus::Empty);
    assert!(!outcome.notified);
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn test_delivery_failure_does_not_skip_sweep() {
    let fixture = Fixture::new(Some(REGISTRY));
    touch_old(&fixture.backup_dir.join("fw9_config_20200101_000000.conf"), 31);
    touch_old(&fixture.backup_dir.join("fw9_system_20200101_000000.txt"), 29);
    let notifier = Arc::new(RecordingNotifier::failing());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let outcome = cycle.run_cycle().await.unwrap();

    assert_eq!(notifier.messages().len(), 1);
    assert!(!outcome.notified);
    assert_eq!(outcome.removed_artifacts, 1);
    assert!(!fixture
        .backup_dir
        .join("fw9_config_20200101_000000.conf")
        .exists());
    assert!(fixture
        .backup_dir
        .join("fw9_system_20200101_000000.txt")
        .exists());
}

#[tokio::test]
async fn test_run_without_notifier() {
    let fixture = Fixture::new(Some(REGISTRY));
    let cycle = fixture.cycle(None);

    let outcome = cycle.run_cycle().await.unwrap();

    assert!(!outcome.notified);
    assert!(outcome.report.contains("FortiGate Backup - Partial"));
    assert!(cycle.send_test_notification().await.unwrap_err().is_fatal());
}

#[tokio::test]
async fn test_run_device_sends_individual_message() {
    let fixture = Fixture::new(Some(REGISTRY));
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    let result = cycle.run_device("fw1").await.unwrap();
    assert!(result.success);

    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("✅ <b>Backup completed</b>"));
    assert!(messages[0].contains("Device: fw1\nHost: 10.0.0.1"));

    let err = cycle.run_device("fw404").await.unwrap_err();
    assert!(err.to_string().contains("fw404"));
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn test_send_test_notification() {
    let fixture = Fixture::new(Some(REGISTRY));
    let notifier = Arc::new(RecordingNotifier::default());
    let cycle = fixture.cycle(Some(notifier.clone() as Arc<dyn Notifier>));

    cycle.send_test_notification().await.unwrap();

    assert!(notifier.messages()[0].contains("Notification test"));
}
