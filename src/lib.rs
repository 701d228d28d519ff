#![cfg_attr(docsrs, feature(doc_cfg))]
//! This crate drives a federated learning demo from the client side: ten
//! simulated hospitals train a model on their local data, share their weights
//! with a central server which aggregates them into a global model, and can then
//! be retrained against that global model.
//!
//! The training itself happens on a remote backend. This crate keeps track of
//! the state of each hospital, calls the backend, and records everything that
//! happens in an activity log.
//!
//! # Driving the demo
//!
//! The entry point is the [`Store`]. It needs a [`Backend`] to talk to. The
//! [`client::Client`] is an implementation of that trait for the HTTP API of the
//! training server.
//!
//! ```no_run
//! # #[cfg(feature = "reqwest-client")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use fl_dashboard::{client::Client, HospitalId, Store};
//!
//! let client = Client::new(reqwest::Client::new(), "http://localhost:5000")?;
//! let store = Store::new(client);
//!
//! store.train_all_local_models().await;
//! store.share_all_weights().await;
//! if store.is_central_model_ready() {
//!     store.train_with_central_model(HospitalId::new(3)?).await;
//! }
//!
//! for entry in store.logs() {
//!     println!("[{}] {}", entry.severity, entry.message);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Actions never fail. When the backend reports an error, the affected
//! hospital goes back to its previous status and the error is added to the
//! activity log. The log can also be followed as it grows with
//! [`Store::subscribe()`].
//!
//! # Settings
//!
//! The `fl-dashboard` binary is configured with a TOML file, see
//! [`settings::Settings`].

pub mod client;
pub mod settings;
pub mod store;
mod traits;

pub use self::{
    store::{HospitalId, HospitalRecord, HospitalStatus, LogEntry, Severity, Store},
    traits::Backend,
};
