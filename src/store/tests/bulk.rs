use mockall::{predicate::eq, Sequence};

use super::utils::{aggregating_server, id, messages, DummyErr, MockServer};
use crate::store::{HospitalStatus, Store};

#[tokio::test]
async fn test_train_all_local_models() {
    let mut seq = Sequence::new();
    let mut server = MockServer::new();
    for i in 1..=10 {
        server
            .expect_train_local()
            .with(eq(id(i)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id| Ok(0.5 + f64::from(id.get()) / 100.0));
    }
    let store = Store::new(server);

    store.train_all_local_models().await;

    for hospital in store.hospitals() {
        assert_eq!(hospital.status, HospitalStatus::Trained);
        assert_eq!(
            hospital.local_accuracy,
            0.5 + f64::from(hospital.id.get()) / 100.0
        );
    }
    // hospital after hospital, never interleaved
    let messages = messages(&store);
    assert_eq!(messages.len(), 20);
    for (i, pair) in (1..=10).zip(messages.chunks(2)) {
        assert_eq!(pair[0], format!("Training model for Hospital {}...", i));
        assert!(pair[1].starts_with(&format!("Hospital {} completed local training", i)));
    }
}

#[tokio::test]
async fn test_train_all_local_models_goes_on_after_failure() {
    let mut server = MockServer::new();
    server.expect_train_local().times(10).returning(|id| {
        if id.get() == 5 {
            Err(DummyErr::boom())
        } else {
            Ok(0.7)
        }
    });
    let store = Store::new(server);

    store.train_all_local_models().await;

    for hospital in store.hospitals() {
        let expected = if hospital.id == id(5) {
            HospitalStatus::Untrained
        } else {
            HospitalStatus::Trained
        };
        assert_eq!(hospital.status, expected);
    }
}

#[tokio::test]
async fn test_share_all_weights() {
    let store = Store::new(aggregating_server(0.9));

    store.share_all_weights().await;

    assert!(store.is_central_model_ready());
    assert!(store.hospitals().iter().all(|h| h.has_shared_weights));

    // aggregation only starts after the last hospital shared its weights
    let messages = messages(&store);
    let last_share = messages
        .iter()
        .position(|m| m == "Hospital 10 sharing weights with central server...")
        .unwrap();
    let aggregation = messages
        .iter()
        .position(|m| m == "All hospitals have shared weights. Aggregating models...")
        .unwrap();
    assert_eq!(aggregation, last_share + 1);
    assert_eq!(aggregation, messages.len() - 2);
}
