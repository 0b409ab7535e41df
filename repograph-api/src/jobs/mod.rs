//! Background Jobs
//!
//! - `cache_gauges`: Publishes per-tier cache sizes and writer counters
//!
//! Jobs take a `tokio::sync::watch` receiver and stop when it turns true.

pub mod cache_gauges;

pub use cache_gauges::{
    cache_gauges_task, refresh_cache_gauges, CacheGaugeJobMetrics, CacheGaugeSnapshot,
};
