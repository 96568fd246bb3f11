//! SQLite-backed probe store implementation.

use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{
    DatabaseStats, DeleteSummary, HostCount, HostInfohash, InfohashPeerCount, InfohashRecord,
    NewPeer, NewTrackerPeer, PeerRecord, ProbeStore, StoreError, TrackerPeerRecord,
};
use crate::infohash::InfoHash;

/// SQLite-backed probe store.
pub struct SqliteProbeStore {
    conn: Mutex<Connection>,
}

impl SqliteProbeStore {
    /// Create a new SQLite store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            -- Probe targets
            CREATE TABLE IF NOT EXISTS infohashes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                infohash TEXT NOT NULL UNIQUE,
                title TEXT,
                files TEXT,
                discovered_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_infohashes_discovered ON infohashes(discovered_at);

            -- Peers found through routing-table lookups
            CREATE TABLE IF NOT EXISTS peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                host TEXT NOT NULL,
                port INTEGER NOT NULL,
                infohash TEXT NOT NULL,
                title TEXT,
                asn INTEGER,
                as_organization TEXT,
                country TEXT,
                city TEXT,
                latitude REAL,
                longitude REAL,
                discovered_at TEXT NOT NULL,
                UNIQUE(host, port, infohash)
            );

            CREATE INDEX IF NOT EXISTS idx_peers_infohash ON peers(infohash);
            CREATE INDEX IF NOT EXISTS idx_peers_host ON peers(host);

            -- Peers reported by trackers
            CREATE TABLE IF NOT EXISTS tracker_peers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                infohash TEXT NOT NULL,
                host TEXT NOT NULL,
                asn INTEGER,
                as_organization TEXT,
                country TEXT,
                city TEXT,
                latitude REAL,
                longitude REAL,
                tracker TEXT NOT NULL,
                seeders INTEGER,
                leechers INTEGER,
                discovered_at TEXT NOT NULL,
                UNIQUE(infohash, host, tracker)
            );

            CREATE INDEX IF NOT EXISTS idx_tracker_peers_infohash ON tracker_peers(infohash);
            CREATE INDEX IF NOT EXISTS idx_tracker_peers_host ON tracker_peers(host);
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Internal("connection mutex poisoned".to_string()))
    }

    fn row_to_infohash(row: &rusqlite::Row) -> rusqlite::Result<InfohashRecord> {
        let files: Option<String> = row.get(3)?;
        let discovered_at: String = row.get(4)?;

        Ok(InfohashRecord {
            id: row.get(0)?,
            info_hash: row.get(1)?,
            title: row.get(2)?,
            files: files.and_then(|f| serde_json::from_str(&f).ok()),
            discovered_at: parse_timestamp(&discovered_at),
        })
    }

    #[cfg(test)]
    pub(crate) fn raw(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn query_infohash_peers(
        &self,
        info_hash: &InfoHash,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PeerRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT host, port, infohash, title, asn, as_organization, country, city,
                        latitude, longitude, discovered_at
                 FROM peers WHERE infohash = ? ORDER BY discovered_at DESC, id DESC
                 LIMIT ? OFFSET ?",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![info_hash.to_hex(), limit, offset], |row| {
                let discovered_at: String = row.get(10)?;
                Ok(PeerRecord {
                    host: row.get(0)?,
                    port: row.get(1)?,
                    info_hash: row.get(2)?,
                    title: row.get(3)?,
                    asn: row.get(4)?,
                    as_organization: row.get(5)?,
                    country: row.get(6)?,
                    city: row.get(7)?,
                    latitude: row.get(8)?,
                    longitude: row.get(9)?,
                    discovered_at: parse_timestamp(&discovered_at),
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }
}

impl ProbeStore for SqliteProbeStore {
    fn upsert_infohash(
        &self,
        info_hash: &InfoHash,
        title: Option<&str>,
        files: Option<&[String]>,
    ) -> Result<(), StoreError> {
        let files_json = files
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO infohashes (infohash, title, files, discovered_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(infohash) DO UPDATE SET
                title = COALESCE(infohashes.title, excluded.title),
                files = COALESCE(infohashes.files, excluded.files),
                discovered_at = excluded.discovered_at",
            params![info_hash.to_hex(), title, files_json, now()],
        )
        .map_err(db_err)?;

        Ok(())
    }

    fn add_infohash(&self, info_hash: &InfoHash, title: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT INTO infohashes (infohash, title, discovered_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(infohash) DO NOTHING",
                params![info_hash.to_hex(), title, now()],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn upsert_peer(&self, peer: &NewPeer) -> Result<bool, StoreError> {
        let place = &peer.location.place;
        let network = &peer.location.network;

        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT INTO peers (host, port, infohash, title, asn, as_organization, country, city,
                                    latitude, longitude, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(host, port, infohash) DO NOTHING",
                params![
                    peer.host.to_string(),
                    peer.port,
                    peer.info_hash.to_hex(),
                    peer.title,
                    network.asn,
                    network.as_organization,
                    place.country_code,
                    place.city,
                    place.latitude,
                    place.longitude,
                    now(),
                ],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn upsert_tracker_peer(&self, peer: &NewTrackerPeer) -> Result<bool, StoreError> {
        let place = &peer.location.place;
        let network = &peer.location.network;

        let conn = self.conn()?;
        let inserted = conn
            .execute(
                "INSERT INTO tracker_peers (infohash, host, asn, as_organization, country, city,
                                            latitude, longitude, tracker, seeders, leechers,
                                            discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(infohash, host, tracker) DO NOTHING",
                params![
                    peer.info_hash.to_hex(),
                    peer.host.to_string(),
                    network.asn,
                    network.as_organization,
                    place.country_code,
                    place.city,
                    place.latitude,
                    place.longitude,
                    peer.tracker,
                    peer.seeders,
                    peer.leechers,
                    now(),
                ],
            )
            .map_err(db_err)?;
        Ok(inserted > 0)
    }

    fn delete_infohashes(&self, ids: &[i64]) -> Result<DeleteSummary, StoreError> {
        if ids.is_empty() {
            return Ok(DeleteSummary::default());
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;

        let id_placeholders = placeholders(ids.len());
        let hashes: Vec<String> = {
            let mut stmt = tx
                .prepare(&format!(
                    "SELECT infohash FROM infohashes WHERE id IN ({id_placeholders})"
                ))
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| row.get(0))
                .map_err(db_err)?;
            rows.collect::<Result<_, _>>().map_err(db_err)?
        };

        let mut summary = DeleteSummary::default();
        if !hashes.is_empty() {
            let hash_placeholders = placeholders(hashes.len());
            summary.tracker_peers = tx
                .execute(
                    &format!("DELETE FROM tracker_peers WHERE infohash IN ({hash_placeholders})"),
                    params_from_iter(hashes.iter()),
                )
                .map_err(db_err)?;
            summary.peers = tx
                .execute(
                    &format!("DELETE FROM peers WHERE infohash IN ({hash_placeholders})"),
                    params_from_iter(hashes.iter()),
                )
                .map_err(db_err)?;
        }
        summary.infohashes = tx
            .execute(
                &format!("DELETE FROM infohashes WHERE id IN ({id_placeholders})"),
                params_from_iter(ids.iter()),
            )
            .map_err(db_err)?;

        // Dropping the transaction without commit rolls back.
        tx.commit().map_err(db_err)?;
        Ok(summary)
    }

    fn list_infohashes(&self) -> Result<Vec<InfohashRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, infohash, title, files, discovered_at FROM infohashes
                 ORDER BY discovered_at DESC, id DESC",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], Self::row_to_infohash)
            .map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_err)?);
        }
        Ok(records)
    }

    fn peers_for_infohash(&self, info_hash: &InfoHash) -> Result<Vec<PeerRecord>, StoreError> {
        // SQLite reads a negative LIMIT as no limit.
        self.query_infohash_peers(info_hash, -1, 0)
    }

    fn peers_for_infohash_page(
        &self,
        info_hash: &InfoHash,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PeerRecord>, StoreError> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        self.query_infohash_peers(info_hash, i64::from(limit), offset)
    }

    fn count_peers_for_infohash(&self, info_hash: &InfoHash) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM peers WHERE infohash = ?",
                params![info_hash.to_hex()],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u64)
    }

    fn tracker_peers_for_infohash(
        &self,
        info_hash: &InfoHash,
    ) -> Result<Vec<TrackerPeerRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT infohash, host, asn, as_organization, country, city, latitude, longitude,
                        tracker, seeders, leechers, discovered_at
                 FROM tracker_peers WHERE infohash = ? ORDER BY tracker, host",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![info_hash.to_hex()], |row| {
                let discovered_at: String = row.get(11)?;
                Ok(TrackerPeerRecord {
                    info_hash: row.get(0)?,
                    host: row.get(1)?,
                    asn: row.get(2)?,
                    as_organization: row.get(3)?,
                    country: row.get(4)?,
                    city: row.get(5)?,
                    latitude: row.get(6)?,
                    longitude: row.get(7)?,
                    tracker: row.get(8)?,
                    seeders: row.get(9)?,
                    leechers: row.get(10)?,
                    discovered_at: parse_timestamp(&discovered_at),
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    fn peers_for_host(
        &self,
        host: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<HostInfohash>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT infohash, title, GROUP_CONCAT(DISTINCT port), MAX(discovered_at) AS latest
                 FROM peers
                 WHERE host = ?1
                 GROUP BY infohash, title
                 ORDER BY latest DESC
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![host, limit, offset], |row| {
                let ports: String = row.get(2)?;
                let latest: String = row.get(3)?;
                let mut ports: Vec<u16> = ports
                    .split(',')
                    .filter_map(|p| p.trim().parse().ok())
                    .collect();
                ports.sort_unstable();

                Ok(HostInfohash {
                    info_hash: row.get(0)?,
                    title: row.get(1)?,
                    ports,
                    latest_discovered_at: parse_timestamp(&latest),
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    fn count_infohashes_for_host(&self, host: &str) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM (
                    SELECT infohash FROM peers WHERE host = ? GROUP BY infohash, title
                 )",
                params![host],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u64)
    }

    fn neighboring_hosts(&self, ip: Ipv4Addr) -> Result<Vec<String>, StoreError> {
        let [a, b, c, _] = ip.octets();
        let block = format!("{a}.{b}.{c}.%");

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT host FROM peers
                 WHERE host LIKE ?1 AND host != ?2
                 ORDER BY host",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![block, ip.to_string()], |row| row.get(0))
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    fn top_hosts(&self, limit: u32) -> Result<Vec<HostCount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT host, COUNT(DISTINCT infohash) AS unique_infohashes
                 FROM peers
                 GROUP BY host
                 ORDER BY unique_infohashes DESC, host
                 LIMIT ?",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let count: i64 = row.get(1)?;
                Ok(HostCount {
                    host: row.get(0)?,
                    unique_infohashes: count as u64,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    fn top_infohashes(&self, limit: u32) -> Result<Vec<InfohashPeerCount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT infohash, title, COUNT(*) AS peer_count
                 FROM peers
                 GROUP BY infohash, title
                 ORDER BY peer_count DESC, infohash
                 LIMIT ?",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let count: i64 = row.get(2)?;
                Ok(InfohashPeerCount {
                    info_hash: row.get(0)?,
                    title: row.get(1)?,
                    peer_count: count as u64,
                })
            })
            .map_err(db_err)?;

        rows.collect::<Result<_, _>>().map_err(db_err)
    }

    fn stats(&self) -> Result<DatabaseStats, StoreError> {
        let conn = self.conn()?;

        let total_infohashes: i64 = conn
            .query_row("SELECT COUNT(*) FROM infohashes", [], |row| row.get(0))
            .map_err(db_err)?;

        let total_peers: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM peers) + (SELECT COUNT(*) FROM tracker_peers)",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        let most_recent: Option<String> = conn
            .query_row(
                "SELECT MAX(discovered_at) FROM (
                    SELECT discovered_at FROM peers
                    UNION ALL
                    SELECT discovered_at FROM tracker_peers
                 )",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?
            .flatten();

        Ok(DatabaseStats {
            total_infohashes: total_infohashes as u64,
            total_peers: total_peers as u64,
            most_recent_peer: most_recent.as_deref().map(parse_timestamp),
        })
    }
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
