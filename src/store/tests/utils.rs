use std::collections::HashMap;

use async_trait::async_trait;
use mockall::mock;
use thiserror::Error;
use tokio::sync::Notify;

use crate::{
    store::{HospitalId, LogEntry, Severity, Store},
    Backend,
};

#[derive(Error, Debug)]
#[error("{0}")]
pub struct DummyErr(pub String);

impl DummyErr {
    pub fn boom() -> Self {
        Self("boom".to_string())
    }
}

mock! {
    pub Server {}

    #[async_trait]
    impl Backend for Server {
        type Error = DummyErr;

        async fn train_local(&self, id: HospitalId) -> Result<f64, DummyErr>;
        async fn train_with_global(&self, id: HospitalId) -> Result<f64, DummyErr>;
        async fn train_all_with_global(&self) -> Result<HashMap<HospitalId, f64>, DummyErr>;
        async fn aggregate(&self) -> Result<f64, DummyErr>;
        async fn reset_data(&self) -> Result<(), DummyErr>;
    }
}

/// A backend whose local training and aggregation block until they are released.
/// Used to observe the store while a request is in flight.
#[derive(Default)]
pub struct GatedServer {
    release: Notify,
}

impl GatedServer {
    /// Let one pending (or the next) local training or aggregation complete.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl Backend for GatedServer {
    type Error = DummyErr;

    async fn train_local(&self, id: HospitalId) -> Result<f64, DummyErr> {
        self.release.notified().await;
        Ok(f64::from(id.get()) / 20.0)
    }

    async fn train_with_global(&self, _id: HospitalId) -> Result<f64, DummyErr> {
        unreachable!("not used by the tests")
    }

    async fn train_all_with_global(&self) -> Result<HashMap<HospitalId, f64>, DummyErr> {
        unreachable!("not used by the tests")
    }

    async fn aggregate(&self) -> Result<f64, DummyErr> {
        self.release.notified().await;
        Ok(0.9)
    }

    async fn reset_data(&self) -> Result<(), DummyErr> {
        Ok(())
    }
}

pub fn id(id: u8) -> HospitalId {
    HospitalId::new(id).unwrap()
}

pub fn last_log<B: Backend>(store: &Store<B>) -> LogEntry {
    store.logs().pop().expect("no log entry")
}

pub fn messages<B: Backend>(store: &Store<B>) -> Vec<String> {
    store.logs().into_iter().map(|entry| entry.message).collect()
}

pub fn count_logs<B: Backend>(store: &Store<B>, severity: Severity) -> usize {
    store
        .logs()
        .iter()
        .filter(|entry| entry.severity == severity)
        .count()
}

/// A mock that accepts the weights of every hospital and aggregates successfully,
/// exactly once.
pub fn aggregating_server(accuracy: f64) -> MockServer {
    let mut server = MockServer::new();
    server
        .expect_aggregate()
        .times(1)
        .returning(move || Ok(accuracy));
    server
}

/// Share the weights of the given hospitals, one after the other.
pub async fn share<B: Backend>(store: &Store<B>, ids: impl IntoIterator<Item = u8>) {
    for i in ids {
        store.share_weights(id(i)).await;
    }
}
