mod bulk;
pub mod utils;

use self::utils::{id, MockServer};
use crate::store::{HospitalRecord, HospitalStatus, Severity, Store};

#[test]
fn test_initial_state() {
    let store = Store::new(MockServer::new());

    let hospitals = store.hospitals();
    assert_eq!(hospitals.len(), 10);
    for (i, hospital) in (1..=10).zip(hospitals) {
        assert_eq!(hospital.id, id(i));
        assert_eq!(hospital.status, HospitalStatus::Untrained);
        assert_eq!(hospital.local_accuracy, 0.0);
        assert_eq!(hospital.global_accuracy, 0.0);
        assert!(!hospital.has_shared_weights);
    }
    assert_eq!(store.selected_hospital(), id(1));
    assert!(!store.is_central_model_ready());
    assert!(store.logs().is_empty());
}

#[test]
fn test_select_hospital() {
    let store = Store::new(MockServer::new());
    store.select_hospital(id(4));
    assert_eq!(store.selected_hospital(), id(4));
    assert!(store.logs().is_empty());
    assert_eq!(store.hospital(id(4)), HospitalRecord::new(id(4)));
}

#[test]
fn test_add_log() {
    let store = Store::new(MockServer::new());
    store.add_log("hello", Severity::Info);
    store.add_log("oops", Severity::Error);

    let logs = store.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, "hello");
    assert_eq!(logs[1].severity, Severity::Error);
}

#[tokio::test]
async fn test_subscribe() {
    let mut server = MockServer::new();
    server.expect_train_local().returning(|_| Ok(0.5));
    let store = Store::new(server);
    store.add_log("before subscribing", Severity::Info);

    let mut rx = store.subscribe();
    store.train_local_model(id(2)).await;

    assert_eq!(rx.recv().await.unwrap().message, "Training model for Hospital 2...");
    let entry = rx.recv().await.unwrap();
    assert_eq!(entry.severity, Severity::Success);
    assert_eq!(
        entry.message,
        "Hospital 2 completed local training with accuracy: 50.00%"
    );
}
