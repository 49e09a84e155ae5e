//! One-shot, best-effort position lookup.
//!
//! The position is queried once at startup and parked in a [`LocationCell`].
//! Questions sent before it resolves (or after it fails) carry no location.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::Deserialize;
use shared::settings::GeolocationSettings;
use shared::transcript::Location;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Location>;
}

/// Always reports the same position
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Result<Location> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "latitude")]
    lat: Option<f64>,
    #[serde(default, alias = "longitude", alias = "lng")]
    lon: Option<f64>,
}

/// Approximate position from an IP geolocation endpoint
pub struct IpGeolocator {
    http: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(Duration::from_secs(10)).build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl LocationProvider for IpGeolocator {
    async fn locate(&self) -> Result<Location> {
        let resp = self.http.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("geolocation lookup failed: {}", resp.status()));
        }
        let body: IpLookup = resp.json().await?;
        if let Some(status) = body.status.as_deref() {
            if status != "success" {
                return Err(anyhow!(
                    "geolocation unavailable: {}",
                    body.message.unwrap_or_else(|| status.to_string())
                ));
            }
        }
        match (body.lat, body.lon) {
            (Some(lat), Some(lng)) => Ok(Location { lat, lng }),
            _ => Err(anyhow!("geolocation reply had no coordinates")),
        }
    }
}

/// Shared slot for the last known position
#[derive(Clone, Default)]
pub struct LocationCell(Arc<RwLock<Option<Location>>>);

impl LocationCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Location> {
        *self.0.read()
    }

    pub fn set(&self, location: Location) {
        *self.0.write() = Some(location);
    }
}

/// Pick a provider for the configured mode; `None` when lookups are disabled.
pub fn provider_from_settings(settings: &GeolocationSettings) -> Option<Box<dyn LocationProvider>> {
    if !settings.enabled {
        return None;
    }
    if let Some(fixed) = settings.fixed {
        return Some(Box::new(FixedLocation(fixed)));
    }
    match IpGeolocator::new(&settings.lookup_url) {
        Ok(geo) => Some(Box::new(geo)),
        Err(e) => {
            tracing::warn!("geolocation disabled: {:#}", e);
            None
        }
    }
}

/// Query once and store the result. Failures only get logged.
pub async fn resolve_once(provider: &dyn LocationProvider, cell: &LocationCell) -> Option<Location> {
    match provider.locate().await {
        Ok(location) => {
            tracing::info!(lat = location.lat, lng = location.lng, "location resolved");
            cell.set(location);
            Some(location)
        }
        Err(e) => {
            tracing::info!("location unavailable: {:#}", e);
            None
        }
    }
}
