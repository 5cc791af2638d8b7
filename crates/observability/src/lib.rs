//! Observability for bth-trader
//!
//! - Structured logging via tracing
//! - Prometheus exporter and the trader's metric set
//!
//! ```ignore
//! use observability::{init_logging, LogFormat, TraderMetrics};
//!
//! init_logging("bth-trader", LogFormat::Compact)?;
//! observability::init_metrics("0.0.0.0", 9100)?;
//! let metrics = TraderMetrics::new();
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, RpcTimer, TraderMetrics};
