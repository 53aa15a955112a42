//! Nominatim-backed reverse geocoding.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use shoebox_types::{
    config::GeocodeConfig,
    geo::{Address, GeoFix},
    Result,
};
use tracing::debug;

use crate::{geocode_error, Geocoder};

/// Reverse lookup response body. Only the address mapping is decoded; the
/// rest of the payload is ignored.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

/// Reverse geocoding client for a Nominatim-compatible endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    throttle: Duration,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| geocode_error(format!("failed to build geocoding client: {err}")))?;
        let throttle = Duration::try_from_secs_f64(config.throttle_secs)
            .map_err(|err| geocode_error(format!("bad throttle interval: {err}")))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            throttle,
        })
    }

    /// Fixed post-call delay honoring the public service's rate limit. Runs
    /// after every call returns, before the next geocode anywhere in the run.
    async fn pause(&self) {
        if !self.throttle.is_zero() {
            tokio::time::sleep(self.throttle).await;
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, fix: GeoFix) -> Result<Option<Address>> {
        debug!(%fix, "reverse geocoding");
        let outcome = self
            .client
            .get(&self.endpoint)
            .query(&[("format", "jsonv2")])
            .query(&[("lat", fix.latitude), ("lon", fix.longitude)])
            .send()
            .await;
        // The delay applies no matter how the call went.
        self.pause().await;

        let response = outcome
            .map_err(|err| geocode_error(format!("reverse geocoding request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(geocode_error(format!(
                "reverse geocoding returned HTTP {status}"
            )));
        }
        let decoded: ReverseResponse = response
            .json()
            .await
            .map_err(|err| geocode_error(format!("unreadable geocoding response: {err}")))?;
        Ok(decoded.address)
    }
}
