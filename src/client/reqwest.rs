use std::time::Duration;

use async_trait::async_trait;

use super::{Client, ClientError, DashboardHttpClient};
use crate::settings::ApiSettings;

#[async_trait]
impl DashboardHttpClient for ::reqwest::Client {
    type PostResponse = bytes::Bytes;

    async fn post(&self, url: &str) -> Result<(u16, Self::PostResponse), ClientError> {
        let resp = ::reqwest::Client::post(self, url)
            .send()
            .await
            .map_err(ClientError::http_error)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(ClientError::http_error)?;
        Ok((status, body))
    }
}

impl Client<::reqwest::Client> {
    /// Create a client for the backend described by the API settings.
    ///
    /// If a timeout is configured, a request taking longer fails like any other
    /// transport error.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is invalid or the HTTP client cannot be built.
    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ClientError> {
        let mut builder = ::reqwest::ClientBuilder::new();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(ClientError::http_error)?;
        Ok(Self::new(http_client, &settings.base_url)?)
    }
}
