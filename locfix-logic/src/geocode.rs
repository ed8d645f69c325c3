use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::GeocodeError,
    sample::{Coordinates, ResolvedLocation},
};

/// Best-effort reverse geocoding, only ever consulted after a fix is committed
pub trait GeocodeClient: Send + Sync {
    /// Look up a human-readable address for the coordinates
    fn resolve_address(
        &self,
        coordinates: Coordinates,
    ) -> impl Future<Output = Result<String, GeocodeError>> + Send;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// How a committed fix should be shown to the user
pub struct FixLabel {
    pub coordinates: Coordinates,
    /// `lat, lng` text, always present
    pub fallback: String,
    /// Address from the geocoder, if it answered in time
    pub address: Option<String>,
}

impl FixLabel {
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            fallback: coordinates.fallback_label(),
            address: None,
        }
    }

    /// The address when we have one, otherwise the coordinates
    pub fn display(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.fallback)
    }
}

/// Label a committed fix, upgrading to an address if the geocoder answers within `budget`.
/// Geocoder failures are logged and otherwise ignored.
pub async fn label_fix<G: GeocodeClient>(
    fix: &ResolvedLocation,
    client: &G,
    budget: Duration,
) -> FixLabel {
    let mut label = FixLabel::from_coordinates(fix.coordinates);

    match tokio::time::timeout(budget, client.resolve_address(fix.coordinates)).await {
        Ok(Ok(address)) if !address.trim().is_empty() => {
            debug!("Resolved {} to {address}", label.fallback);
            label.address = Some(address);
        }
        Ok(Ok(_)) => warn!("Geocoder returned an empty address for {}", label.fallback),
        Ok(Err(why)) => warn!("Geocoding {} failed: {why}", label.fallback),
        Err(_) => warn!("Geocoding {} took longer than {budget:?}", label.fallback),
    }

    label
}
