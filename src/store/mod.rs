//! The hospital training and aggregation store.
//!
//! The [`Store`] holds a [`Registry`] of ten [`HospitalRecord`]s and an
//! [`ActivityLog`]. It is driven through its actions, each of which updates the
//! hospitals optimistically, performs one call to the [`Backend`], and records the
//! outcome:
//!
//! ```text
//!               train_local_model / train_with_central_model
//!   untrained ------------------------------------------------> training
//!       ^                                                          |
//!       |  failure (no local accuracy)                  success    |
//!       +----------------------------------------- trained <------+
//!                                failure (local accuracy > 0) -----^
//! ```
//!
//! Sharing weights does not change the status of a hospital. Once all the
//! hospitals shared their weights, the global model is aggregated and hospitals can
//! be retrained against it.
//!
//! [`Backend`]: crate::Backend

mod hospital;
mod log;
#[allow(clippy::module_inception)]
mod store;
#[cfg(test)]
mod tests;

pub use self::{
    hospital::{
        HospitalId,
        HospitalRecord,
        HospitalStatus,
        InvalidHospitalId,
        Registry,
        HOSPITAL_COUNT,
    },
    log::{ActivityLog, LogEntry, Severity},
    store::Store,
};
