//! Telemetry - logging and metrics for the HTTP services
//!
//! Structured `tracing` output and Prometheus metrics. Everything works
//! standalone without external collectors.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics, metrics_handler, RepographMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracing, TelemetryConfig};
