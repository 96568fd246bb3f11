use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::time::timeout;

/// Run the binary against a config and return its exit status.
async fn run_with_config(config_path: &std::path::Path) -> std::process::Output {
    timeout(
        Duration::from_secs(10),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_swarmprobe"))
            .env("SWARMPROBE_CONFIG", config_path)
            .env("RUST_LOG", "error") // Quiet logs during tests
            .kill_on_drop(true)
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_with_config(std::path::Path::new("/nonexistent/config.toml")).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_port_exits_with_error() {
    let config = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 0
"#,
    );
    let result = run_with_config(config.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_unknown_pipeline_exits_with_error() {
    let config = write_config(
        r#"
[probe]
default_pipelines = ["Port Scan"]
"#,
    );
    let result = run_with_config(config.path()).await;
    assert!(!result.status.success());
}

#[tokio::test]
async fn test_missing_geoip_database_exits_with_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = write_config(&format!(
        r#"
[server]
host = "127.0.0.1"
port = 3005

[database]
path = "{db}"

[geoip]
city_db = "/nonexistent/GeoLite2-City.mmdb"
asn_db = "/nonexistent/GeoLite2-ASN.mmdb"
"#,
        db = dir.path().join("probe.db").display()
    ));
    let result = run_with_config(config.path()).await;
    assert!(!result.status.success());
}
