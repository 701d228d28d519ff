//! JSON bodies returned by the training backend. Fields the dashboard does not use
//! (`message`, `hospital_id`) are ignored.

use std::collections::HashMap;

use serde::Deserialize;

use crate::store::HospitalId;

/// The part common to all the responses. A missing `success` field counts as a
/// failure.
#[derive(Debug, Deserialize)]
pub(super) struct Outcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl Outcome {
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Response of `POST /train/{id}`
#[derive(Debug, Deserialize)]
pub(super) struct LocalAccuracy {
    pub local_accuracy: f64,
}

/// Response of `POST /train-with-global/{id}` and `POST /aggregate`
#[derive(Debug, Deserialize)]
pub(super) struct GlobalAccuracy {
    pub global_accuracy: f64,
}

/// Response of `POST /train-all-with-global`
#[derive(Debug, Deserialize)]
pub(super) struct TrainAllResults {
    pub results: HashMap<HospitalId, f64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_outcome() {
        let outcome = Outcome::from_value(&json!({"success": true})).unwrap();
        assert!(outcome.success);
        assert!(outcome.error.is_none());

        let outcome = Outcome::from_value(&json!({"error": "boom"})).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("boom"));

        let outcome = Outcome::from_value(&json!({"success": false, "error": null})).unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_train_all_results() {
        let value = json!({
            "message": "All hospitals trained with global model",
            "results": {"3": 0.75, "4": 0.5},
            "success": true,
        });
        let resp: TrainAllResults = serde_json::from_value(value).unwrap();
        assert_eq!(resp.results[&HospitalId::new(3).unwrap()], 0.75);
        assert_eq!(resp.results[&HospitalId::new(4).unwrap()], 0.5);
    }
}
