//! First-start download of missing lookup tables.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use super::GeoIpError;
use crate::config::GeoIpConfig;

/// Download and gunzip any table whose file is missing.
///
/// Present files are left alone, even if stale. An empty URL disables the
/// download for that table.
pub async fn ensure_databases(config: &GeoIpConfig) -> Result<(), GeoIpError> {
    let client = reqwest::Client::builder()
        .timeout(config.download_timeout())
        .user_agent(concat!("swarmprobe/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| GeoIpError::Download {
            table: "city",
            url: config.city_db_url.clone(),
            reason: e.to_string(),
        })?;

    ensure_table(&client, "city", &config.city_db, &config.city_db_url).await?;
    ensure_table(&client, "asn", &config.asn_db, &config.asn_db_url).await?;
    Ok(())
}

async fn ensure_table(
    client: &reqwest::Client,
    table: &'static str,
    path: &Path,
    url: &str,
) -> Result<(), GeoIpError> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(table, path = %path.display(), "GeoIP database present");
        return Ok(());
    }
    if url.is_empty() {
        warn!(table, path = %path.display(), "GeoIP database missing and no download URL set");
        return Ok(());
    }

    let fail = |reason: String| GeoIpError::Download {
        table,
        url: url.to_string(),
        reason,
    };

    info!(table, url, "Downloading GeoIP database");
    let compressed = fetch(client, url).await.map_err(|e| fail(e.to_string()))?;
    let data = gunzip(&compressed).map_err(|e| fail(format!("gunzip: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| fail(e.to_string()))?;
    }
    // Written aside first so a partial file never passes the presence check.
    let partial = path.with_extension("part");
    tokio::fs::write(&partial, &data)
        .await
        .map_err(|e| fail(e.to_string()))?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| fail(e.to_string()))?;

    info!(table, path = %path.display(), bytes = data.len(), "GeoIP database saved");
    Ok(())
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<bytes::Bytes, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.bytes().await
}

fn gunzip(compressed: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    GzDecoder::new(compressed).read_to_end(&mut data)?;
    Ok(data)
}
