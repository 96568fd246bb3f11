use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Place half of an enrichment result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceInfo {
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Network-owner half of an enrichment result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub asn: Option<u32>,
    pub as_organization: Option<String>,
}

/// Location and network metadata for one IP address.
///
/// Both halves are optional and filled independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub place: PlaceInfo,
    pub network: NetworkInfo,
}

impl GeoLocation {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Errors preparing the lookup tables. Fatal at startup.
#[derive(Debug, Error)]
pub enum GeoIpError {
    #[error("Failed to open {table} database at {path}: {reason}")]
    Open {
        table: &'static str,
        path: String,
        reason: String,
    },

    #[error("Failed to download {table} database from {url}: {reason}")]
    Download {
        table: &'static str,
        url: String,
        reason: String,
    },
}
