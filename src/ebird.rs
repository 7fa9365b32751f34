use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::{Observation, QueryKey};
use crate::error::LifermapError;

/// One remote fetch per query key. Implementations reject on transport or
/// status failure; the retry layer around the batch decides what happens
/// next.
pub trait SightingsClient: Send + Sync {
    fn fetch_observations(&self, key: &QueryKey) -> Result<Vec<Observation>, LifermapError>;
}

#[derive(Clone)]
pub struct EbirdHttpClient {
    client: Client,
    base_url: String,
}

impl EbirdHttpClient {
    /// Reads the API token from `EBIRD_API_TOKEN`.
    pub fn new() -> Result<Self, LifermapError> {
        let token = std::env::var("EBIRD_API_TOKEN")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(LifermapError::MissingApiToken)?;
        Self::with_token(&token)
    }

    pub fn with_token(token: &str) -> Result<Self, LifermapError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lifermap/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LifermapError::EbirdHttp(err.to_string()))?,
        );
        headers.insert(
            "X-eBirdApiToken",
            HeaderValue::from_str(token)
                .map_err(|err| LifermapError::EbirdHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| LifermapError::EbirdHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: "https://api.ebird.org/v2".to_string(),
        })
    }

    fn historic_url(base_url: &str, key: &QueryKey) -> String {
        format!(
            "{}/data/obs/{}/historic/{}",
            base_url,
            key.region.as_str(),
            key.date.format("%Y/%m/%d")
        )
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, LifermapError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "eBird request failed".to_string());
        Err(LifermapError::EbirdStatus { status, message })
    }
}

impl SightingsClient for EbirdHttpClient {
    fn fetch_observations(&self, key: &QueryKey) -> Result<Vec<Observation>, LifermapError> {
        let url = Self::historic_url(&self.base_url, key);
        let start = std::time::Instant::now();
        let response = self
            .client
            .get(&url)
            .query(&[("detail", "simple")])
            .send()
            .map_err(|err| LifermapError::EbirdHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| LifermapError::EbirdHttp(err.to_string()))?;
        let observations: Vec<Observation> = serde_json::from_str(&body)
            .map_err(|err| LifermapError::MalformedResponse(err.to_string()))?;
        tracing::debug!(
            key = %key,
            count = observations.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "ebird.response"
        );
        Ok(observations)
    }
}
