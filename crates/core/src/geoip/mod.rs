//! IP enrichment from offline lookup tables.
//!
//! Two MaxMind-format databases are opened once at startup: a city table
//! (place names and coordinates) and an ASN table (network owner). Each
//! lookup is independent and best-effort; a miss leaves that half of the
//! [`GeoLocation`] empty and is never an error.
//!
//! Missing databases are fetched once, gzip-compressed, from the configured
//! URLs before they are opened.

mod download;
mod maxmind;
#[cfg(test)]
mod test_tables;
mod types;

pub use download::ensure_databases;
pub use maxmind::MaxmindEnricher;
pub use types::*;

use std::net::IpAddr;

/// Resolves IP addresses to location and network-owner metadata.
///
/// Implementations must be cheap and synchronous: they are called once per
/// discovered peer from inside the discovery pipelines.
pub trait Enricher: Send + Sync {
    fn resolve(&self, ip: IpAddr) -> GeoLocation;
}
