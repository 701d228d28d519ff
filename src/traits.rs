use std::collections::HashMap;

use async_trait::async_trait;

use crate::store::HospitalId;

/// A trait used by the [`Store`] to drive the training backend.
///
/// Implementations report both transport failures and failures signaled by the
/// backend itself as errors. The [`Store`] only relies on their `Display` output,
/// which ends up verbatim in the activity log.
///
/// [`Store`]: crate::Store
#[async_trait]
pub trait Backend: Send + Sync {
    type Error: ::std::error::Error + Send + Sync + 'static;

    /// Train the local model of the given hospital and return its accuracy.
    async fn train_local(&self, id: HospitalId) -> Result<f64, Self::Error>;

    /// Retrain the given hospital against the global model and return its new
    /// accuracy.
    async fn train_with_global(&self, id: HospitalId) -> Result<f64, Self::Error>;

    /// Retrain every hospital against the global model, returning the accuracy of
    /// each hospital.
    async fn train_all_with_global(&self) -> Result<HashMap<HospitalId, f64>, Self::Error>;

    /// Aggregate the shared weights into the global model and return its accuracy.
    async fn aggregate(&self) -> Result<f64, Self::Error>;

    /// Redistribute the data among the hospitals and drop all the trained models.
    async fn reset_data(&self) -> Result<(), Self::Error>;
}
