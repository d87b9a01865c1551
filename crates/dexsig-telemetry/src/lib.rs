//! Prometheus metrics and structured logging for dexsig.
//!
//! - `init_logging`: `tracing` subscriber, JSON in production
//! - `Metrics`: signing, broadcast, validation and node-latency counters
//! - `gather_metrics`: Prometheus text exposition

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::{gather_metrics, Metrics};
