use crate::*;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("{field}: port must be non-zero")]
    InvalidPort { field: String },

    #[error("{field}: invalid URL '{url}': {message}")]
    InvalidUrl { field: String, url: String, message: String },

    #[error("{field} is required")]
    MissingCredential { field: String },

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("Port {port} is used by both the gRPC server and the metrics exporter")]
    PortConflict { port: u16 },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &TraderConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_grpc(&config.grpc, &mut report);
    validate_kraken(&config.kraken, &mut report);
    validate_orders(&config.orders, &mut report);
    validate_metrics(&config.metrics, &config.grpc, &mut report);

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    let formats = ["pretty", "json", "compact"];
    if !formats.contains(&service.log_format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(service.log_format.clone()));
    }
}

fn validate_grpc(grpc: &GrpcConfig, report: &mut ValidationReport) {
    if grpc.port == 0 {
        report.add_error(ValidationError::InvalidPort {
            field: "grpc.port".to_string(),
        });
    }

    if grpc.host != "127.0.0.1" && grpc.host != "localhost" {
        report.add_warning(
            "grpc.host",
            &format!("gRPC server will listen on {}; the API is unauthenticated", grpc.host),
        );
    }
}

fn validate_url(field: &str, raw: &str, schemes: &[&str], report: &mut ValidationReport) {
    match Url::parse(raw) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            url: raw.to_string(),
            message: format!("scheme must be one of {:?}, got '{}'", schemes, url.scheme()),
        }),
        Err(e) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            url: raw.to_string(),
            message: e.to_string(),
        }),
    }
}

fn validate_credential(field: &str, value: &str, report: &mut ValidationReport) {
    if value.trim().is_empty() {
        report.add_error(ValidationError::MissingCredential {
            field: field.to_string(),
        });
        return;
    }

    for var in unresolved_env_vars(value) {
        report.add_error(ValidationError::InvalidEnvVar {
            var,
            message: format!("referenced by {} but not set", field),
        });
    }
}

fn validate_kraken(kraken: &KrakenConfig, report: &mut ValidationReport) {
    validate_url("kraken.ws_url", &kraken.ws_url, &["ws", "wss"], report);
    validate_url("kraken.rest_url", &kraken.rest_url, &["http", "https"], report);

    validate_credential("kraken.api_key", &kraken.api_key, report);
    validate_credential("kraken.private_key", &kraken.private_key, report);

    if kraken.request_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "kraken.request_timeout_seconds".to_string(),
        });
    }
}

fn validate_orders(orders: &OrdersConfig, report: &mut ValidationReport) {
    let positive = [
        ("orders.event_buffer", orders.event_buffer as u64),
        ("orders.gc_interval_ms", orders.gc_interval_ms),
        ("orders.grace_period_seconds", orders.grace_period_seconds),
        ("orders.submit_timeout_seconds", orders.submit_timeout_seconds),
        ("orders.stream_buffer", orders.stream_buffer as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: field.to_string(),
            });
        }
    }

    if orders.grace_period().as_millis() < u128::from(orders.gc_interval_ms) {
        report.add_warning(
            "orders.grace_period_seconds",
            "Grace period is shorter than the sweep interval; terminal orders may vanish before they can be queried",
        );
    }

    if orders.submit_timeout_seconds > 120 {
        report.add_warning(
            "orders.submit_timeout_seconds",
            &format!("Submit timeout of {}s is unusually long", orders.submit_timeout_seconds),
        );
    }
}

fn validate_metrics(metrics: &MetricsConfig, grpc: &GrpcConfig, report: &mut ValidationReport) {
    if !metrics.enabled {
        return;
    }

    if metrics.port == 0 {
        report.add_error(ValidationError::InvalidPort {
            field: "metrics.port".to_string(),
        });
    } else if metrics.port == grpc.port {
        report.add_error(ValidationError::PortConflict { port: metrics.port });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TraderConfig {
        let mut config = generate_default_config();
        config.kraken.api_key = "key".to_string();
        config.kraken.private_key = "c2VjcmV0".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        let report = validate_config(&valid_config());
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unresolved_credentials_are_errors() {
        let report = validate_config(&generate_default_config());
        let vars: Vec<String> = report
            .errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::InvalidEnvVar { var, .. } => Some(var.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(vars, vec!["BTH_KRAKEN_API_KEY", "BTH_KRAKEN_PRIVATE_KEY"]);
    }

    #[test]
    fn test_bad_urls_and_log_format() {
        let mut config = valid_config();
        config.kraken.ws_url = "https://ws-auth.kraken.com".to_string();
        config.kraken.rest_url = "not a url".to_string();
        config.service.log_format = "verbose".to_string();

        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_zero_values_rejected() {
        let mut config = valid_config();
        config.orders.stream_buffer = 0;
        config.orders.submit_timeout_seconds = 0;
        config.grpc.port = 0;

        let report = validate_config(&config);
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_metrics_port_conflict() {
        let mut config = valid_config();
        config.metrics.enabled = true;
        config.metrics.port = config.grpc.port;

        let report = validate_config(&config);
        assert!(matches!(report.errors.as_slice(), [ValidationError::PortConflict { port: 5500 }]));
    }

    #[test]
    fn test_warnings() {
        let mut config = valid_config();
        config.grpc.host = "0.0.0.0".to_string();
        config.orders.grace_period_seconds = 1;
        config.orders.gc_interval_ms = 5000;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }
}
