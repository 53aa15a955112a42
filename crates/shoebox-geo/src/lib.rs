//! Coordinate conversion and reverse geocoding.

mod nominatim;

pub use nominatim::NominatimGeocoder;

use async_trait::async_trait;
use shoebox_types::{
    geo::{Address, GeoFix},
    Result, ShoeboxError,
};

/// Converts a degrees/minutes/seconds reading plus hemisphere reference into
/// a signed decimal coordinate. No bounds validation; out-of-range values
/// pass through unchecked.
pub fn dms_to_decimal(dms: (f64, f64, f64), reference: char) -> f64 {
    let (degrees, minutes, seconds) = dms;
    let decimal = degrees + minutes / 60.0 + seconds / 3600.0;
    if matches!(reference.to_ascii_uppercase(), 'S' | 'W') {
        -decimal
    } else {
        decimal
    }
}

/// Best-effort place name from address components, probing municipality,
/// then town, then county. Empty when nothing usable is present or the
/// mapping is absent entirely. Never fails.
pub fn place_label(address: Option<&Address>) -> String {
    let Some(address) = address else {
        return String::new();
    };
    [&address.city, &address.town, &address.county]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default()
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up address components for a coordinate pair. `Ok(None)` means
    /// the service answered but carried no address mapping.
    async fn reverse(&self, fix: GeoFix) -> Result<Option<Address>>;
}

/// Geocoder answering every query with the same preset address. Used for
/// deterministic tests and offline wiring.
#[derive(Debug, Clone, Default)]
pub struct FixedGeocoder {
    address: Option<Address>,
}

impl FixedGeocoder {
    pub fn new(address: Option<Address>) -> Self {
        Self { address }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn reverse(&self, _fix: GeoFix) -> Result<Option<Address>> {
        Ok(self.address.clone())
    }
}

pub fn geocode_error(message: impl Into<String>) -> ShoeboxError {
    ShoeboxError::Geocode(message.into())
}
