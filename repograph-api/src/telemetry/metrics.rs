//! Prometheus Metrics Definitions
//!
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, register_histogram,
    register_histogram_vec, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramVec,
    TextEncoder,
};
use repograph_storage::Tier;

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Graph generation can take minutes on a cold cache, so the tail is long.
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0,
];

/// Graph worker round-trip buckets (seconds)
const WORKER_LATENCY_BUCKETS: &[f64] = &[0.050, 0.250, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<RepographMetrics>> = Lazy::new(RepographMetrics::new);

/// The global metrics, if registration succeeded.
pub fn metrics() -> Option<&'static RepographMetrics> {
    METRICS.as_ref().ok()
}

fn registration_failed(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Container for all repograph metrics.
#[derive(Clone)]
pub struct RepographMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Artifact resolutions - labels: format (svg, dot), outcome (hit, miss, error)
    pub artifact_requests_total: CounterVec,

    /// Calls to the graph worker - labels: status (success, error)
    pub graph_worker_requests_total: CounterVec,

    pub graph_worker_request_duration_seconds: Histogram,

    /// Background cache writes dropped because the queue was full
    pub cache_writes_dropped: Gauge,

    /// Background cache writes rejected by the store
    pub cache_writes_failed: Gauge,

    /// Entries per cache tier - labels: tier
    pub cache_entries: GaugeVec,

    /// Repositories with a popularity score
    pub scored_repos: Gauge,
}

impl RepographMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "repograph_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_failed("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "repograph_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("http_request_duration_seconds", e))?,

            artifact_requests_total: register_counter_vec!(
                "repograph_artifact_requests_total",
                "Artifact resolutions by format and cache outcome",
                &["format", "outcome"]
            )
            .map_err(|e| registration_failed("artifact_requests_total", e))?,

            graph_worker_requests_total: register_counter_vec!(
                "repograph_graph_worker_requests_total",
                "Requests sent to the graph worker",
                &["status"]
            )
            .map_err(|e| registration_failed("graph_worker_requests_total", e))?,

            graph_worker_request_duration_seconds: register_histogram!(
                "repograph_graph_worker_request_duration_seconds",
                "Graph worker round-trip time in seconds",
                WORKER_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_failed("graph_worker_request_duration_seconds", e))?,

            cache_writes_dropped: register_gauge!(
                "repograph_cache_writes_dropped",
                "Background cache writes dropped since startup"
            )
            .map_err(|e| registration_failed("cache_writes_dropped", e))?,

            cache_writes_failed: register_gauge!(
                "repograph_cache_writes_failed",
                "Background cache writes rejected by the store since startup"
            )
            .map_err(|e| registration_failed("cache_writes_failed", e))?,

            cache_entries: register_gauge_vec!(
                "repograph_cache_entries",
                "Entries per cache tier",
                &["tier"]
            )
            .map_err(|e| registration_failed("cache_entries", e))?,

            scored_repos: register_gauge!(
                "repograph_scored_repos",
                "Repositories with a popularity score"
            )
            .map_err(|e| registration_failed("scored_repos", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record one artifact resolution. `outcome` is `hit`, `miss` or `error`.
    pub fn record_artifact(&self, format: &str, outcome: &str) {
        self.artifact_requests_total
            .with_label_values(&[format, outcome])
            .inc();
    }

    pub fn record_graph_worker_call(&self, success: bool, duration_secs: f64) {
        let status = if success { "success" } else { "error" };
        self.graph_worker_requests_total
            .with_label_values(&[status])
            .inc();
        self.graph_worker_request_duration_seconds
            .observe(duration_secs);
    }

    pub fn set_writer_counters(&self, dropped: u64, failed: u64) {
        self.cache_writes_dropped.set(dropped as f64);
        self.cache_writes_failed.set(failed as f64);
    }

    pub fn set_tier_entries(&self, tier: Tier, count: u64) {
        self.cache_entries
            .with_label_values(&[tier.name()])
            .set(count as f64);
    }

    pub fn set_scored_repos(&self, count: u64) {
        self.scored_repos.set(count as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    // Registration happens on first use, so force it before gathering.
    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Metrics unavailable");
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::core::Collector;

    fn registered() -> Result<&'static RepographMetrics, String> {
        METRICS
            .as_ref()
            .map_err(|e| format!("Metrics init failed: {}", e.message))
    }

    #[test]
    fn test_metrics_creation() -> Result<(), String> {
        let metrics = registered()?;
        assert!(!metrics.http_requests_total.desc().is_empty());
        Ok(())
    }

    #[test]
    fn test_record_artifact() -> Result<(), String> {
        let metrics = registered()?;
        let before = metrics
            .artifact_requests_total
            .with_label_values(&["svg", "hit"])
            .get();
        metrics.record_artifact("svg", "hit");
        let after = metrics
            .artifact_requests_total
            .with_label_values(&["svg", "hit"])
            .get();
        assert!(after >= before + 1.0);
        Ok(())
    }

    #[test]
    fn test_record_http_and_worker_calls() -> Result<(), String> {
        let metrics = registered()?;
        metrics.record_http_request("GET", "/graph/{repo}.svg", 200, 0.015);
        metrics.record_graph_worker_call(true, 0.5);
        metrics.record_graph_worker_call(false, 1.5);
        let before = metrics
            .graph_worker_requests_total
            .with_label_values(&["error"])
            .get();
        metrics.record_graph_worker_call(false, 0.1);
        assert!(metrics.graph_worker_requests_total.with_label_values(&["error"]).get() > before);
        Ok(())
    }
}
