//! HTTP client for the Open Charge Map POI API.

use core::time::Duration;

use reqwest::Client;
use serde_json::Value;
use station_structs::{PipelineError, PipelineResult};
use tracing::info;

/// Single request timeout. The fetch is never retried.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest body excerpt quoted in an upstream error.
const ERROR_SNIPPET_CHARS: usize = 500;

/// Client for the Open Charge Map POI endpoint.
pub struct OpenChargeMapClient {
    client: Client,
    base_url: String,
}

impl OpenChargeMapClient {
    /// Creates a client for the POI endpoint at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Upstream(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetches POIs for one country.
    ///
    /// # Arguments
    ///
    /// * `countrycode` - ISO country code, e.g. "DE"
    /// * `maxresults` - Maximum number of POIs returned
    /// * `opendata` - Restrict to open-data licensed POIs
    /// * `api_key` - Sent as `key` when present
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Upstream`] if the request fails, the status is
    /// not a success, or the body is not a non-empty JSON array.
    pub async fn fetch_pois(
        &self,
        countrycode: &str,
        maxresults: u32,
        opendata: bool,
        api_key: Option<&str>,
    ) -> PipelineResult<Vec<Value>> {
        let mut params = vec![
            ("output", String::from("json")),
            ("countrycode", countrycode.to_string()),
            ("maxresults", maxresults.to_string()),
            ("compact", String::from("true")),
            ("verbose", String::from("false")),
        ];
        if opendata {
            params.push(("opendata", String::from("true")));
        }
        if let Some(key) = api_key {
            params.push(("key", key.to_string()));
        }

        info!(countrycode, maxresults, opendata, "Calling Open Charge Map API");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| PipelineError::Upstream(format!("Open Charge Map request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_SNIPPET_CHARS).collect();
            return Err(PipelineError::Upstream(format!(
                "Open Charge Map API call failed (status={status}, body_snippet={snippet})"
            )));
        }

        let data: Value = response.json().await.map_err(|e| {
            PipelineError::Upstream(format!("Failed to parse Open Charge Map response: {e}"))
        })?;

        match data {
            Value::Array(pois) if !pois.is_empty() => {
                info!("Fetched {} POIs from Open Charge Map", pois.len());
                Ok(pois)
            }
            _ => Err(PipelineError::Upstream(format!(
                "Open Charge Map API returned no POIs for countrycode={countrycode}, maxresults={maxresults}"
            ))),
        }
    }
}
