//! FSM unit tests

use fortivault::backup::fsm::{BackupEvent, BackupFsm, BackupStage};

#[test]
fn test_fsm_initial_state() {
    let fsm = BackupFsm::new();
    assert_eq!(fsm.stage(), BackupStage::Pending);
    assert!(fsm.error().is_none());
    assert!(fsm.failed_at().is_none());
}

#[test]
fn test_fsm_backup_success_flow() {
    let mut fsm = BackupFsm::new();

    // Pending -> Validating -> Connecting
    fsm.process(BackupEvent::Start).unwrap();
    assert_eq!(fsm.stage(), BackupStage::Validating);
    fsm.process(BackupEvent::Validated).unwrap();
    assert_eq!(fsm.stage(), BackupStage::Connecting);

    // Connecting -> Executing
    fsm.process(BackupEvent::Connected).unwrap();
    assert_eq!(fsm.stage(), BackupStage::Executing);
    assert!(fsm.stage().holds_session());

    fsm.process(BackupEvent::Executed).unwrap();
    fsm.process(BackupEvent::Written).unwrap();
    assert_eq!(fsm.stage(), BackupStage::CollectingSystemInfo);

    fsm.process(BackupEvent::SystemInfoDone).unwrap();
    fsm.process(BackupEvent::Closed).unwrap();
    assert_eq!(fsm.stage(), BackupStage::Succeeded);
    assert!(fsm.stage().is_terminal());
}

#[test]
fn test_fsm_failure_with_open_session_closes_first() {
    let mut fsm = BackupFsm::new();

    fsm.process(BackupEvent::Start).unwrap();
    fsm.process(BackupEvent::Validated).unwrap();
    fsm.process(BackupEvent::Connected).unwrap();
    fsm.process(BackupEvent::Fail("command timed out".to_string()))
        .unwrap();

    assert_eq!(fsm.stage(), BackupStage::Closing);
    assert_eq!(fsm.failed_at(), Some(BackupStage::Executing));

    fsm.process(BackupEvent::Closed).unwrap();
    assert_eq!(fsm.stage(), BackupStage::Failed);
    assert_eq!(fsm.error(), Some("command timed out"));
}

#[test]
fn test_fsm_connection_failure_is_terminal() {
    let mut fsm = BackupFsm::new();

    fsm.process(BackupEvent::Start).unwrap();
    fsm.process(BackupEvent::Validated).unwrap();
    fsm.process(BackupEvent::Fail("connection refused".to_string()))
        .unwrap();

    assert_eq!(fsm.stage(), BackupStage::Failed);
    assert_eq!(fsm.failed_at(), Some(BackupStage::Connecting));
}

#[test]
fn test_fsm_invalid_transitions() {
    let mut fsm = BackupFsm::new();

    // Cannot connect before validating
    assert!(fsm.process(BackupEvent::Connected).is_err());

    fsm.process(BackupEvent::Start).unwrap();
    fsm.process(BackupEvent::Fail("missing host".to_string()))
        .unwrap();

    // Terminal stages accept nothing
    assert!(fsm.process(BackupEvent::Fail("again".to_string())).is_err());
    assert!(fsm.process(BackupEvent::Closed).is_err());
    assert_eq!(fsm.error(), Some("missing host"));
}
