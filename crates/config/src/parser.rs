use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TraderConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let config = parse_config(&substitution::substitute_env_vars(&content)?)?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Parse YAML that already had its environment variables substituted
pub fn parse_config(yaml: &str) -> Result<TraderConfig> {
    serde_yaml::from_str(yaml).with_context(|| "Failed to parse YAML configuration")
}

/// Configuration written by `init`; credentials come from the environment
#[instrument]
pub fn generate_default_config() -> TraderConfig {
    TraderConfig {
        service: ServiceConfig::default(),
        grpc: GrpcConfig::default(),
        kraken: KrakenConfig {
            ws_url: default_ws_url(),
            rest_url: default_rest_url(),
            api_key: "${BTH_KRAKEN_API_KEY}".to_string(),
            private_key: "${BTH_KRAKEN_PRIVATE_KEY}".to_string(),
            request_timeout_seconds: default_request_timeout_seconds(),
        },
        orders: OrdersConfig::default(),
        metrics: MetricsConfig::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &TraderConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
kraken:
  api_key: key
  private_key: c2VjcmV0
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();

        assert_eq!(config.service.name, "bth-trader");
        assert_eq!(config.grpc.listen_address(), "127.0.0.1:5500");
        assert_eq!(config.kraken.ws_url, "wss://ws-auth.kraken.com");
        assert_eq!(config.kraken.rest_url, "https://api.kraken.com");
        assert_eq!(config.orders.gc_interval(), std::time::Duration::from_secs(2));
        assert_eq!(config.orders.grace_period(), std::time::Duration::from_secs(60));
        assert_eq!(config.orders.stream_buffer, 100);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_overrides() {
        let yaml = r#"
service:
  log_format: json
grpc:
  host: 0.0.0.0
  port: 6000
kraken:
  api_key: key
  private_key: c2VjcmV0
orders:
  submit_timeout_seconds: 5
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.service.log_format, "json");
        assert_eq!(config.grpc.listen_address(), "0.0.0.0:6000");
        assert_eq!(config.orders.submit_timeout_seconds, 5);
        assert_eq!(config.orders.event_buffer, 1024);
    }

    #[test]
    fn test_missing_credentials_fail_to_parse() {
        assert!(parse_config("grpc:\n  port: 5500\n").is_err());
    }

    #[test]
    fn test_save_and_load_default_config() {
        let path = std::env::temp_dir().join(format!("bth-trader-config-{}.yaml", std::process::id()));
        save_config(&generate_default_config(), &path).unwrap();

        let loaded = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.grpc.port, 5500);
        assert_eq!(loaded.orders.submit_timeout_seconds, 30);
    }
}
