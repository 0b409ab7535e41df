//! HTTP Routes Module
//!
//! Two surfaces are assembled here:
//! - The front service: artifacts, popularity, health, metrics
//! - The graph worker: `POST /graph`, health, metrics

pub mod graph;
pub mod health;
pub mod top_repos;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use repograph_storage::CacheStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::constants::DEFAULT_CORS_MAX_AGE_SECS;
use crate::state::{AppState, WorkerState};
use crate::telemetry::{metrics_handler, observability_middleware};

pub use graph::create_router as graph_router;
pub use health::create_router as health_router;
pub use top_repos::create_router as top_repos_router;
pub use worker::create_router as worker_router;

/// Front service router.
pub fn create_web_router(state: AppState, config: &ServerConfig) -> Router {
    let store = state.store.clone();

    Router::new()
        .merge(graph::create_router(state.clone()))
        .merge(top_repos::create_router(state))
        .nest("/health", health::create_router(store))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
}

/// Graph worker router.
pub fn create_worker_router(state: WorkerState, store: Arc<dyn CacheStore>) -> Router {
    Router::new()
        .merge(worker::create_router(state))
        .nest("/health", health::create_router(store))
        .route("/metrics", get(metrics_handler))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(DEFAULT_CORS_MAX_AGE_SECS));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
