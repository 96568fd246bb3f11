use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Probe limits and windows are non-zero
/// - Default session parameters are usable for autostart
/// - The metadata listen port can form a one-port range
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let probe = &config.probe;
    let non_zero = [
        ("probe.tracker_window_secs", probe.tracker_window_secs as usize),
        ("probe.max_in_flight_lookups", probe.max_in_flight_lookups),
        ("probe.lookup_timeout_secs", probe.lookup_timeout_secs as usize),
        (
            "probe.max_concurrent_tracker_rounds",
            probe.max_concurrent_tracker_rounds,
        ),
        ("probe.announce_timeout_secs", probe.announce_timeout_secs as usize),
        ("probe.default_workers", probe.default_workers),
        ("probe.default_listener_budget", probe.default_listener_budget),
    ];
    for (key, value) in non_zero {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{key} cannot be 0")));
        }
    }

    if probe.default_pipelines.is_empty() {
        return Err(ConfigError::ValidationError(
            "probe.default_pipelines cannot be empty".to_string(),
        ));
    }

    if config.metadata.enabled && config.metadata.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "metadata.timeout_secs cannot be 0 when metadata is enabled".to_string(),
        ));
    }

    if config.metadata.listen_port == Some(u16::MAX) {
        return Err(ConfigError::ValidationError(format!(
            "metadata.listen_port must be below {}",
            u16::MAX
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_window_fails() {
        let mut config = Config::default();
        config.probe.tracker_window_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("tracker_window_secs"));
    }

    #[test]
    fn test_validate_empty_default_pipelines_fails() {
        let mut config = Config::default();
        config.probe.default_pipelines.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_cooldown_allowed() {
        let mut config = Config::default();
        config.probe.cooldown_secs = 0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_top_metadata_port_fails() {
        let mut config = Config::default();
        config.metadata.listen_port = Some(u16::MAX);
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("metadata.listen_port"));

        config.metadata.listen_port = Some(u16::MAX - 1);
        assert!(validate_config(&config).is_ok());
    }
}
