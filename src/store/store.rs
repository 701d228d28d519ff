use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::{self, broadcast};
use tracing::{debug, warn};

use super::{
    ActivityLog,
    HospitalId,
    HospitalRecord,
    HospitalStatus,
    LogEntry,
    Registry,
    Severity,
};
use crate::Backend;

/// Everything the store owns. Only ever accessed under the store's lock, and the
/// lock is never held across a backend call.
#[derive(Debug)]
struct State {
    registry: Registry,
    log: ActivityLog,
    selected: HospitalId,
    central_model_ready: bool,
    /// Set by the share that completes the set of shared weights, so that
    /// aggregation is triggered only once.
    aggregation_triggered: bool,
    /// Incremented by every successful reset.
    generation: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            registry: Registry::default(),
            log: ActivityLog::default(),
            selected: HospitalId::FIRST,
            central_model_ready: false,
            aggregation_triggered: false,
            generation: 0,
        }
    }
}

impl State {
    /// Check whether the data was reset since `generation` was read. If so, the
    /// result is dropped with a log entry.
    fn is_outdated(&mut self, generation: u64, what: &str) -> bool {
        if self.generation == generation {
            return false;
        }
        debug!("reset since generation {}, dropping {}", generation, what);
        self.log.push(
            format!("Discarding outdated {}: hospital data was reset", what),
            Severity::Info,
        );
        true
    }
}

/// Format an accuracy in `[0, 1]` as a percentage with two decimals.
fn percent(accuracy: f64) -> String {
    format!("{:.2}%", accuracy * 100.0)
}

/// The hospital training and aggregation store.
///
/// The store owns the hospital registry and the activity log, and is the only way
/// to change them. Each action performs at most one backend call; state changes
/// before and after that call are applied atomically. Actions never fail: errors
/// end up in the activity log and the affected hospital goes back to its previous
/// status.
///
/// Actions take `&self`, so a store can be shared between tasks with an `Arc`.
/// Actions training the same hospital run one after the other.
pub struct Store<B> {
    backend: B,
    state: Mutex<State>,
    /// One token per hospital, held while the hospital is being trained.
    tokens: Vec<sync::Mutex<()>>,
}

impl<B> Store<B>
where
    B: Backend,
{
    /// Create a store with ten untrained hospitals, driving the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(State::default()),
            tokens: HospitalId::all().map(|_| sync::Mutex::new(())).collect(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // the state is consistent after every statement, so a poisoned lock is fine
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the state as one atomic step.
    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state())
    }

    fn token(&self, id: HospitalId) -> &sync::Mutex<()> {
        &self.tokens[id.index()]
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }

    /// Get a snapshot of all the hospitals, ordered by id.
    pub fn hospitals(&self) -> Vec<HospitalRecord> {
        self.state().registry.snapshot()
    }

    pub fn hospital(&self, id: HospitalId) -> HospitalRecord {
        self.state().registry.get(id).clone()
    }

    /// Get a snapshot of the activity log, oldest entry first.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state().log.entries().to_vec()
    }

    /// Get a receiver for every log entry appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.state().log.subscribe()
    }

    pub fn selected_hospital(&self) -> HospitalId {
        self.state().selected
    }

    pub fn select_hospital(&self, id: HospitalId) {
        self.state().selected = id;
    }

    /// Whether the global model has been aggregated, which allows retraining the
    /// hospitals against it.
    pub fn is_central_model_ready(&self) -> bool {
        self.state().central_model_ready
    }

    pub fn add_log(&self, message: impl Into<String>, severity: Severity) {
        self.state().log.push(message, severity);
    }

    /// Train the local model of a hospital.
    pub async fn train_local_model(&self, id: HospitalId) {
        let _token = self.token(id).lock().await;
        let generation = self.update(|state| {
            state.registry.get_mut(id).status = HospitalStatus::Training;
            state
                .log
                .push(format!("Training model for Hospital {}...", id), Severity::Info);
            state.generation
        });

        let result = self.backend.train_local(id).await;
        self.update(|state| {
            if state.is_outdated(generation, &format!("result for Hospital {}", id)) {
                return;
            }
            match result {
                Ok(accuracy) => {
                    let hospital = state.registry.get_mut(id);
                    hospital.status = HospitalStatus::Trained;
                    hospital.local_accuracy = accuracy;
                    state.log.push(
                        format!(
                            "Hospital {} completed local training with accuracy: {}",
                            id,
                            percent(accuracy)
                        ),
                        Severity::Success,
                    );
                }
                Err(e) => {
                    state.log.push(
                        format!("Error training model for Hospital {}: {}", id, e),
                        Severity::Error,
                    );
                    state.registry.get_mut(id).status = HospitalStatus::Untrained;
                }
            }
        });
    }

    /// Share the weights of a hospital with the central server. The share that
    /// completes the set of shared weights triggers the aggregation of the global
    /// model.
    pub async fn share_weights(&self, id: HospitalId) {
        let aggregation = self.update(|state| {
            state.log.push(
                format!("Hospital {} sharing weights with central server...", id),
                Severity::Info,
            );
            state.registry.get_mut(id).has_shared_weights = true;

            if state.registry.all_shared() && !state.aggregation_triggered {
                state.aggregation_triggered = true;
                state.log.push(
                    "All hospitals have shared weights. Aggregating models...",
                    Severity::Info,
                );
                Some(state.generation)
            } else {
                state.log.push(
                    format!("Hospital {} shared weights with central server", id),
                    Severity::Success,
                );
                None
            }
        });
        let generation = match aggregation {
            Some(generation) => generation,
            None => return,
        };

        let result = self.backend.aggregate().await;
        self.update(|state| {
            // the flag belongs to the new round after a reset
            if state.is_outdated(generation, "aggregation result") {
                return;
            }
            match result {
                Ok(accuracy) => {
                    state.central_model_ready = true;
                    state.log.push(
                        format!(
                            "Central model aggregation complete with accuracy: {}",
                            percent(accuracy)
                        ),
                        Severity::Success,
                    );
                }
                Err(e) => {
                    // the next share tries again
                    state.aggregation_triggered = false;
                    state
                        .log
                        .push(format!("Error sharing weights: {}", e), Severity::Error);
                }
            }
        });
    }

    /// Retrain a hospital against the global model.
    ///
    /// The caller is expected to check [`is_central_model_ready()`] first.
    ///
    /// [`is_central_model_ready()`]: Store::is_central_model_ready
    pub async fn train_with_central_model(&self, id: HospitalId) {
        let _token = self.token(id).lock().await;
        let generation = self.update(|state| {
            state.registry.get_mut(id).status = HospitalStatus::Training;
            state.log.push(
                format!("Training Hospital {} with global model...", id),
                Severity::Info,
            );
            state.generation
        });

        let result = self.backend.train_with_global(id).await;
        self.update(|state| {
            if state.is_outdated(generation, &format!("result for Hospital {}", id)) {
                return;
            }
            match result {
                Ok(accuracy) => {
                    let hospital = state.registry.get_mut(id);
                    hospital.status = HospitalStatus::Trained;
                    hospital.global_accuracy = accuracy;
                    state.log.push(
                        format!(
                            "Hospital {} updated with central model. New accuracy: {}",
                            id,
                            percent(accuracy)
                        ),
                        Severity::Success,
                    );
                }
                Err(e) => {
                    state.log.push(
                        format!("Error training with global model: {}", e),
                        Severity::Error,
                    );
                    let hospital = state.registry.get_mut(id);
                    hospital.status = hospital.settled_status();
                }
            }
        });
    }

    /// Retrain all the hospitals against the global model with a single backend
    /// call.
    pub async fn train_all_hospitals(&self) {
        let generation = self.update(|state| {
            state.log.push(
                "Starting global training for all hospitals...",
                Severity::Info,
            );
            state.generation
        });

        let result = self.backend.train_all_with_global().await;
        self.update(|state| {
            if state.is_outdated(generation, "global training results") {
                return;
            }
            match result {
                Ok(results) => {
                    for hospital in state.registry.iter_mut() {
                        hospital.status = HospitalStatus::Trained;
                        match results.get(&hospital.id) {
                            Some(accuracy) => hospital.global_accuracy = *accuracy,
                            None => {
                                warn!("no global accuracy reported for hospital {}", hospital.id)
                            }
                        }
                    }
                    state.log.push(
                        "Global training completed for all hospitals",
                        Severity::Success,
                    );
                }
                Err(e) => state.log.push(
                    format!("Error training all hospitals: {}", e),
                    Severity::Error,
                ),
            }
        });
    }

    /// Redistribute the data among the hospitals and start over with ten untrained
    /// hospitals. The activity log is kept.
    ///
    /// Results of requests still in flight when the reset succeeds are discarded.
    pub async fn reset_data(&self) {
        self.add_log("Resetting hospital data...", Severity::Info);

        match self.backend.reset_data().await {
            Ok(()) => self.update(|state| {
                state.registry = Registry::default();
                state.central_model_ready = false;
                state.aggregation_triggered = false;
                state.generation += 1;
                state.log.push(
                    "Hospital data has been randomly redistributed",
                    Severity::Success,
                );
            }),
            Err(e) => self.add_log(format!("Error resetting data: {}", e), Severity::Error),
        }
    }

    /// Train the local models of all the hospitals, one hospital after the other.
    pub async fn train_all_local_models(&self) {
        for id in HospitalId::all() {
            debug!("bulk local training: hospital {}", id);
            self.train_local_model(id).await;
        }
    }

    /// Share the weights of all the hospitals, one hospital after the other.
    pub async fn share_all_weights(&self) {
        for id in HospitalId::all() {
            debug!("bulk weight sharing: hospital {}", id);
            self.share_weights(id).await;
        }
    }
}
