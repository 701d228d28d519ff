//! Hospital identities, records and the fixed-size registry holding them.

use std::{convert::TryFrom, str::FromStr};

use derive_more::{Display, Into};
use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of hospitals taking part in the demo.
pub const HOSPITAL_COUNT: u8 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hospital id {0:?}: expected an integer between 1 and 10")]
pub struct InvalidHospitalId(pub String);

/// Identifier of a hospital. Always in `1..=HOSPITAL_COUNT`.
#[derive(Clone, Copy, Debug, Display, Into, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HospitalId(u8);

impl HospitalId {
    /// The hospital selected when the dashboard starts.
    pub const FIRST: HospitalId = HospitalId(1);

    /// Create a hospital id.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not in `1..=HOSPITAL_COUNT`.
    pub fn new(id: u8) -> Result<Self, InvalidHospitalId> {
        if (1..=HOSPITAL_COUNT).contains(&id) {
            Ok(Self(id))
        } else {
            Err(InvalidHospitalId(id.to_string()))
        }
    }

    /// Iterate over all the hospital ids, in ascending order.
    pub fn all() -> impl Iterator<Item = HospitalId> {
        (1..=HOSPITAL_COUNT).map(HospitalId)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Position of the hospital in the registry.
    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for HospitalId {
    type Error = InvalidHospitalId;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl FromStr for HospitalId {
    type Err = InvalidHospitalId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| InvalidHospitalId(s.to_string()))
            .and_then(Self::new)
    }
}

impl<'de> Deserialize<'de> for HospitalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = u8::deserialize(deserializer)?;
        Self::new(id).map_err(SerdeError::custom)
    }
}

/// Training status of a hospital.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HospitalStatus {
    #[display(fmt = "untrained")]
    Untrained,
    /// A request for this hospital is in flight.
    #[display(fmt = "training")]
    Training,
    #[display(fmt = "trained")]
    Trained,
}

/// State of a single hospital as seen by the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HospitalRecord {
    pub id: HospitalId,
    pub status: HospitalStatus,
    /// Accuracy of the model trained on the hospital's own data, in `[0, 1]`.
    pub local_accuracy: f64,
    /// Accuracy after retraining against the aggregated model, in `[0, 1]`.
    pub global_accuracy: f64,
    pub has_shared_weights: bool,
}

impl HospitalRecord {
    /// A fresh, untrained record.
    pub fn new(id: HospitalId) -> Self {
        Self {
            id,
            status: HospitalStatus::Untrained,
            local_accuracy: 0.0,
            global_accuracy: 0.0,
            has_shared_weights: false,
        }
    }

    /// Status to fall back to when retraining against the global model fails.
    pub(crate) fn settled_status(&self) -> HospitalStatus {
        if self.local_accuracy > 0.0 {
            HospitalStatus::Trained
        } else {
            HospitalStatus::Untrained
        }
    }
}

/// The ordered collection of all the hospital records. Records are never added or
/// removed, only replaced as a whole on reset.
#[derive(Clone, Debug, PartialEq)]
pub struct Registry(Vec<HospitalRecord>);

impl Default for Registry {
    fn default() -> Self {
        Self(HospitalId::all().map(HospitalRecord::new).collect())
    }
}

impl Registry {
    pub fn get(&self, id: HospitalId) -> &HospitalRecord {
        &self.0[id.index()]
    }

    pub fn get_mut(&mut self, id: HospitalId) -> &mut HospitalRecord {
        &mut self.0[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &HospitalRecord> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut HospitalRecord> {
        self.0.iter_mut()
    }

    /// Whether every hospital has shared its weights with the central server.
    pub fn all_shared(&self) -> bool {
        self.0.iter().all(|h| h.has_shared_weights)
    }

    pub fn snapshot(&self) -> Vec<HospitalRecord> {
        self.0.clone()
    }
}
