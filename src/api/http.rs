//! reqwest implementation of [`CharacterApi`]

use super::{ApiError, CharacterApi};
use crate::config::Config;
use crate::models::Page;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::StatusCode;
use std::time::Duration;

/// Listing client for `GET {api_url}/character`
///
/// `reqwest::Client` is reference counted, so every request clones it into
/// its own `'static` future.
#[derive(Clone)]
pub struct HttpCharacterApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCharacterApi {
    /// Create a client for `base_url` (e.g. `https://rickandmortyapi.com/api`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into();
        tracing::info!(
            "Initialized character API client: {} (timeout: {:?})",
            base_url,
            timeout
        );

        Ok(Self { client, base_url })
    }

    /// Create a client from the application config
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.api_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/character", self.base_url.trim_end_matches('/'))
    }
}

impl CharacterApi for HttpCharacterApi {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch_page(&self, page: u32) -> BoxFuture<'static, Result<Page, ApiError>> {
        let request = self
            .client
            .get(self.endpoint())
            .query(&[("page", page.to_string())]);
        get_page(request, false).boxed()
    }

    fn search_by_name(&self, name: &str) -> BoxFuture<'static, Result<Page, ApiError>> {
        let request = self.client.get(self.endpoint()).query(&[("name", name)]);
        // The API answers a name query without matches with 404
        get_page(request, true).boxed()
    }
}

/// Send the request and decode the body as a [`Page`]
async fn get_page(
    request: reqwest::RequestBuilder,
    not_found_is_empty: bool,
) -> Result<Page, ApiError> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;

    let status = response.status();

    if status == StatusCode::NOT_FOUND && not_found_is_empty {
        tracing::debug!("Search returned 404, treating as no matches");
        return Ok(Page::empty());
    }

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ApiError::Network(format!("HTTP {}: {}", status, error_text)));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Network(format!("Failed to read response body: {}", e)))?;

    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}
