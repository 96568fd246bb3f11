//! MaxMind database backed enricher.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::{geoip2, MaxMindDBError, Reader};
use tracing::{info, warn};

use super::{Enricher, GeoIpError, GeoLocation, NetworkInfo, PlaceInfo};
use crate::config::GeoIpConfig;
use crate::metrics;

/// Enricher backed by a city table and an ASN table.
pub struct MaxmindEnricher {
    city: Reader<Vec<u8>>,
    asn: Reader<Vec<u8>>,
}

impl MaxmindEnricher {
    /// Open both tables. Either one failing to open is an error.
    pub fn open(config: &GeoIpConfig) -> Result<Self, GeoIpError> {
        let city = open_table("city", &config.city_db)?;
        let asn = open_table("asn", &config.asn_db)?;

        info!(
            city_db = %config.city_db.display(),
            asn_db = %config.asn_db.display(),
            "GeoIP databases loaded"
        );

        Ok(Self { city, asn })
    }

    fn lookup_place(&self, ip: IpAddr) -> PlaceInfo {
        match self.city.lookup::<geoip2::City>(ip) {
            Ok(record) => PlaceInfo {
                city: record
                    .city
                    .and_then(|c| c.names)
                    .and_then(|names| names.get("en").map(|s| s.to_string())),
                country_code: record
                    .country
                    .and_then(|c| c.iso_code)
                    .map(|s| s.to_string()),
                latitude: record.location.as_ref().and_then(|l| l.latitude),
                longitude: record.location.as_ref().and_then(|l| l.longitude),
            },
            Err(e) => {
                log_miss("city", ip, &e);
                PlaceInfo::default()
            }
        }
    }

    fn lookup_network(&self, ip: IpAddr) -> NetworkInfo {
        match self.asn.lookup::<geoip2::Asn>(ip) {
            Ok(record) => NetworkInfo {
                asn: record.autonomous_system_number,
                as_organization: record
                    .autonomous_system_organization
                    .map(|s| s.to_string()),
            },
            Err(e) => {
                log_miss("asn", ip, &e);
                NetworkInfo::default()
            }
        }
    }
}

impl Enricher for MaxmindEnricher {
    fn resolve(&self, ip: IpAddr) -> GeoLocation {
        GeoLocation {
            place: self.lookup_place(ip),
            network: self.lookup_network(ip),
        }
    }
}

fn open_table(table: &'static str, path: &Path) -> Result<Reader<Vec<u8>>, GeoIpError> {
    Reader::open_readfile(path).map_err(|e| GeoIpError::Open {
        table,
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn log_miss(table: &'static str, ip: IpAddr, err: &MaxMindDBError) {
    metrics::ENRICHMENT_MISSES.with_label_values(&[table]).inc();
    warn!(%ip, table, error = %err, "GeoIP lookup failed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::test_tables::{asn_record, city_record, write_table};
    use std::net::Ipv4Addr;
    use std::path::PathBuf;

    /// City rows for two /24s, ASN row for only the first.
    fn open_test_tables(dir: &Path) -> MaxmindEnricher {
        let config = GeoIpConfig {
            city_db: dir.join("city.mmdb"),
            asn_db: dir.join("asn.mmdb"),
            ..Default::default()
        };
        write_table(
            &config.city_db,
            "GeoLite2-City",
            vec![
                (
                    Ipv4Addr::new(203, 0, 113, 0),
                    24,
                    city_record("Amsterdam", "NL", 52.37, 4.89),
                ),
                (
                    Ipv4Addr::new(198, 51, 100, 0),
                    24,
                    city_record("Sydney", "AU", -33.87, 151.21),
                ),
            ],
        );
        write_table(
            &config.asn_db,
            "GeoLite2-ASN",
            vec![(Ipv4Addr::new(203, 0, 113, 0), 24, asn_record(1136, "KPN B.V."))],
        );
        MaxmindEnricher::open(&config).unwrap()
    }

    #[test]
    fn test_resolve_fills_both_halves() {
        let dir = tempfile::TempDir::new().unwrap();
        let enricher = open_test_tables(dir.path());

        let location = enricher.resolve("203.0.113.7".parse().unwrap());
        assert_eq!(
            location,
            GeoLocation {
                place: PlaceInfo {
                    city: Some("Amsterdam".to_string()),
                    country_code: Some("NL".to_string()),
                    latitude: Some(52.37),
                    longitude: Some(4.89),
                },
                network: NetworkInfo {
                    asn: Some(1136),
                    as_organization: Some("KPN B.V.".to_string()),
                },
            }
        );
    }

    #[test]
    fn test_resolve_city_only_leaves_network_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let enricher = open_test_tables(dir.path());
        let misses = metrics::ENRICHMENT_MISSES.with_label_values(&["asn"]).get();

        let location = enricher.resolve("198.51.100.9".parse().unwrap());
        assert_eq!(location.place.city.as_deref(), Some("Sydney"));
        assert_eq!(location.place.country_code.as_deref(), Some("AU"));
        assert_eq!(location.network, NetworkInfo::default());
        assert!(metrics::ENRICHMENT_MISSES.with_label_values(&["asn"]).get() > misses);
    }

    #[test]
    fn test_resolve_unknown_address_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let enricher = open_test_tables(dir.path());

        assert_eq!(
            enricher.resolve("192.0.2.1".parse().unwrap()),
            GeoLocation::default()
        );
        assert!(enricher.resolve("2001:db8::1".parse().unwrap()).is_empty());
    }

    #[test]
    fn test_open_missing_city_table_fails() {
        let config = GeoIpConfig {
            city_db: PathBuf::from("/nonexistent/city.mmdb"),
            asn_db: PathBuf::from("/nonexistent/asn.mmdb"),
            ..Default::default()
        };
        match MaxmindEnricher::open(&config) {
            Err(GeoIpError::Open { table, path, .. }) => {
                assert_eq!(table, "city");
                assert_eq!(path, "/nonexistent/city.mmdb");
            }
            _ => panic!("expected open failure"),
        }
    }

    #[test]
    fn test_open_garbage_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.mmdb");
        std::fs::write(&bogus, b"definitely not a maxmind database").unwrap();

        let config = GeoIpConfig {
            city_db: bogus.clone(),
            asn_db: bogus,
            ..Default::default()
        };
        assert!(MaxmindEnricher::open(&config).is_err());
    }
}
