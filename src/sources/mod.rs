//! HTTP clients for the two upstream sources
//!
//! The countries source returns a JSON array of country objects; the
//! exchange-rate source returns an object whose `rates` member maps currency
//! codes to units of local currency per USD.
//!
//! Every request uses the configured timeout. Transient failures (timeouts,
//! transport errors, 429/5xx) are retried with exponential backoff; once the
//! attempts are spent the last error is returned so a persistent outage
//! still reaches the caller.

use reqwest::{header::ACCEPT, Client};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::models::{RatesResponse, RawCountry};
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Client for the countries and exchange-rate sources
pub struct SourceClient {
    /// HTTP client with configured timeout and compression
    client: Client,

    countries_url: String,

    rates_url: String,

    retry: RetryConfig,
}

impl SourceClient {
    /// Create a client from explicit settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(
        countries_url: impl Into<String>,
        rates_url: impl Into<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(concat!("country-atlas/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            countries_url: countries_url.into(),
            rates_url: rates_url.into(),
            retry,
        })
    }

    /// Create a client from the service configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            config.sources.countries_url.clone(),
            config.sources.rates_url.clone(),
            config.request_timeout(),
            config.retry_config(),
        )
    }

    /// Fetch the raw country list
    ///
    /// The body must be a JSON array; each item is decoded on its own so a
    /// malformed entry only loses its own bad fields.
    pub async fn fetch_countries(&self) -> Result<Vec<RawCountry>, FetchError> {
        let entries: Vec<serde_json::Value> = self.get_json(&self.countries_url).await?;
        let countries: Vec<RawCountry> = entries.into_iter().map(RawCountry::from_value).collect();
        tracing::info!(count = countries.len(), "Fetched country list");
        Ok(countries)
    }

    /// Fetch the currency code -> rate mapping
    ///
    /// A body without a `rates` member yields an empty mapping.
    pub async fn fetch_rates(&self) -> Result<HashMap<String, f64>, FetchError> {
        let response: RatesResponse = self.get_json(&self.rates_url).await?;
        tracing::info!(count = response.rates.len(), "Fetched exchange rates");
        Ok(response.rates)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        with_retry_if(&self.retry, || self.get_json_once::<T>(url), FetchError::is_transient).await
    }

    async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        tracing::debug!(url = %url, "Requesting upstream");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}
