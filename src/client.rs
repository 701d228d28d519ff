//! HTTP client for the training backend.
//!
//! The [`Client`] speaks the backend's JSON API and implements [`Backend`] on top of
//! any transport implementing [`DashboardHttpClient`]. With the `reqwest-client`
//! feature, `reqwest::Client` is such a transport.

#[cfg(feature = "reqwest-client")]
mod reqwest;
mod responses;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use thiserror::Error;
use tracing::debug;
use url::Url;

use self::responses::{GlobalAccuracy, LocalAccuracy, Outcome, TrainAllResults};
use crate::{store::HospitalId, Backend};

/// Error returned by a [`Client`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("failed to deserialize data: {0}")]
    Deserialize(String),

    #[error("unexpected response from the backend: HTTP {0}")]
    UnexpectedResponse(u16),

    /// The backend answered but reported a failure. Holds the backend's error
    /// message, or a default one if it gave none.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    BaseUrl(#[from] InvalidBaseUrl),
}

impl ClientError {
    pub(crate) fn http_error<E: std::error::Error>(e: E) -> Self {
        Self::Http(format!("{}", e))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialize(format!("{}", e))
    }
}

/// A basic HTTP interface that [`Client`] HTTP backends must implement.
#[async_trait]
pub trait DashboardHttpClient {
    /// Response body type for `POST` requests
    type PostResponse: AsRef<[u8]> + Send;

    /// Perform an HTTP `POST` without body on the given URL.
    ///
    /// The status code and the body must be returned whatever the status code is:
    /// the backend describes its failures in the body of `500` responses.
    async fn post(&self, url: &str) -> Result<(u16, Self::PostResponse), ClientError>;
}

/// Error returned when trying to create a [`Client`] with an invalid address for
/// the backend.
#[derive(Debug, Error)]
#[error("Invalid base URL: {}", .0)]
pub struct InvalidBaseUrl(String);

#[derive(Debug, Clone)]
/// A client that communicates with the training backend via HTTP(S).
pub struct Client<C> {
    /// HTTP(S) client
    client: C,
    /// Backend URL
    base_url: Url,
}

impl<C> Client<C>
where
    C: DashboardHttpClient,
{
    /// Create a new client.
    ///
    /// # Args
    ///
    /// - `http_client` is the HTTP client that will be used to perform the HTTP
    ///   requests. Any HTTP client can be used, as long as it implements the
    ///   [`DashboardHttpClient`] trait.
    /// - `base_url` is the URL to the training backend
    ///
    /// # Errors
    ///
    /// An error is returned if `base_url` is not a valid URL
    pub fn new(http_client: C, base_url: &str) -> Result<Self, InvalidBaseUrl> {
        let base_url = Url::parse(base_url).map_err(|e| InvalidBaseUrl(format!("{}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(InvalidBaseUrl(String::from("cannot be a base URL")));
        }
        Ok(Self {
            client: http_client,
            base_url,
        })
    }

    /// Append the given segments to the client base URL
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in `new()`: the base URL can be a base
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post<T>(&self, url: Url, default_error: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        debug!("POST {}", url);
        let (status, body) = self.client.post(url.as_str()).await?;
        decode(status, body.as_ref(), default_error)
    }
}

/// Decode a backend response body. A body without `success: true` is turned into a
/// [`ClientError::Rejected`] error.
fn decode<T>(status: u16, body: &[u8], default_error: &str) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => {
            return Err(ClientError::UnexpectedResponse(status))
        }
        Err(e) => return Err(e.into()),
    };
    let outcome = Outcome::from_value(&value)?;
    if !outcome.success {
        return Err(ClientError::Rejected(
            outcome.error.unwrap_or_else(|| default_error.to_string()),
        ));
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl<C> Backend for Client<C>
where
    C: DashboardHttpClient + Send + Sync,
{
    type Error = ClientError;

    async fn train_local(&self, id: HospitalId) -> Result<f64, Self::Error> {
        let url = self.url(&["train", &id.to_string()]);
        let resp: LocalAccuracy = self.post(url, "Failed to train model").await?;
        Ok(resp.local_accuracy)
    }

    async fn train_with_global(&self, id: HospitalId) -> Result<f64, Self::Error> {
        let url = self.url(&["train-with-global", &id.to_string()]);
        let resp: GlobalAccuracy = self.post(url, "Failed to train with global model").await?;
        Ok(resp.global_accuracy)
    }

    async fn train_all_with_global(&self) -> Result<HashMap<HospitalId, f64>, Self::Error> {
        let url = self.url(&["train-all-with-global"]);
        let resp: TrainAllResults = self
            .post(url, "Failed to train all hospitals with global model")
            .await?;
        Ok(resp.results)
    }

    async fn aggregate(&self) -> Result<f64, Self::Error> {
        let url = self.url(&["aggregate"]);
        let resp: GlobalAccuracy = self.post(url, "Failed to aggregate models").await?;
        Ok(resp.global_accuracy)
    }

    async fn reset_data(&self) -> Result<(), Self::Error> {
        let url = self.url(&["reset-data"]);
        let _: IgnoredAny = self.post(url, "Failed to reset hospital data").await?;
        Ok(())
    }
}
