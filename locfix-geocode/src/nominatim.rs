use std::time::Duration;

use log::debug;
use reqwest::Client;
use serde::Deserialize;

use locfix_logic::{Coordinates, GeocodeClient, GeocodeError, prelude::*};

use crate::server::{self, DEFAULT_BASE_URL};

const USER_AGENT: &str = concat!("locfix/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

fn parse_response(body: &str) -> Result<String, GeocodeError> {
    let resp = serde_json::from_str::<ReverseResponse>(body)
        .map_err(|err| GeocodeError::Decode(err.to_string()))?;

    if let Some(err) = resp.error {
        debug!("Geocoder had no result: {err}");
        return Err(GeocodeError::NoAddress);
    }

    resp.display_name
        .filter(|name| !name.trim().is_empty())
        .ok_or(GeocodeError::NoAddress)
}

/// Reverse geocoder talking to a Nominatim compatible `/reverse` endpoint
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Geocoder for the endpoint chosen at compile time
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl GeocodeClient for NominatimGeocoder {
    async fn resolve_address(&self, coordinates: Coordinates) -> Result<String, GeocodeError> {
        let url = server::reverse_url(&self.base_url, coordinates);
        debug!("Reverse geocoding {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| GeocodeError::Request(err.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|err| GeocodeError::Request(err.to_string()))?;

        parse_response(&body)
    }
}
