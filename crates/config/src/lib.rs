use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of the YAML configuration file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraderConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub grpc: GrpcConfig,
    pub kraken: KrakenConfig,
    #[serde(default)]
    pub orders: OrdersConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    /// pretty, json or compact
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GrpcConfig {
    #[serde(default = "default_grpc_host")]
    pub host: String,
    #[serde(default = "default_grpc_port")]
    pub port: u16,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: default_grpc_host(),
            port: default_grpc_port(),
        }
    }
}

impl GrpcConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KrakenConfig {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    pub api_key: String,
    /// Base64 encoded API secret
    pub private_key: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl KrakenConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdersConfig {
    /// Capacity of the decoded order and trade channels
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    #[serde(default = "default_gc_interval_ms")]
    pub gc_interval_ms: u64,
    /// How long a terminal order stays in the cache after being marked
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,
    #[serde(default = "default_submit_timeout_seconds")]
    pub submit_timeout_seconds: u64,
    /// Per-client queue of the order stream
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for OrdersConfig {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            gc_interval_ms: default_gc_interval_ms(),
            grace_period_seconds: default_grace_period_seconds(),
            submit_timeout_seconds: default_submit_timeout_seconds(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl OrdersConfig {
    pub fn gc_interval(&self) -> Duration {
        Duration::from_millis(self.gc_interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_metrics_host(),
            port: default_metrics_port(),
        }
    }
}
