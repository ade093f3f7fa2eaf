//! Geolocation provider boundary
//!
//! The core only cares about one question: "which country does this IP come
//! from?". An empty answer and a failed lookup are treated identically by
//! the callers (both degrade to the "Unknown" cache sentinel), so the
//! contract here stays deliberately narrow.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const API_URL: &str = "https://api.ipgeolocation.io/ipgeo";
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Resolve an IP to a country name. An empty string is a valid answer
    /// (e.g. reserved ranges like 127.0.0.1).
    async fn fetch_location(&self, ip: &str) -> Result<String>;
}

/// ipgeolocation.io client.
pub struct IpGeolocationClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeolocationResponse {
    #[serde(default)]
    country_name: Option<String>,
}

impl IpGeolocationClient {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("banlog/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client for geolocation lookups")?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl GeoProvider for IpGeolocationClient {
    async fn fetch_location(&self, ip: &str) -> Result<String> {
        let response = self
            .client
            .get(API_URL)
            .query(&[("apiKey", self.api_key.as_str()), ("ip", ip)])
            .send()
            .await
            .with_context(|| format!("geolocation request for '{ip}' failed"))?
            .error_for_status()
            .with_context(|| format!("geolocation lookup for '{ip}' was rejected"))?;

        let geolocation: GeolocationResponse = response
            .json()
            .await
            .context("failed to decode geolocation response")?;

        Ok(geolocation.country_name.unwrap_or_default())
    }
}
