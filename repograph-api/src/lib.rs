//! repograph API - HTTP services for dependency graph rendering
//!
//! The front service serves rendered images and graph descriptions from the
//! cache tiers, tracks popularity and refreshes on demand. The graph worker
//! is the isolated service that materializes and extracts untrusted sources.
//! `standalone` mode runs the whole pipeline in one process.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod graph_client;
pub mod jobs;
pub mod macros;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use bootstrap::{build_services, open_store, Services};
pub use config::{
    AppConfig, CacheBackend, JobsConfig, PipelineConfig, ServerConfig, ServiceMode, StoreConfig,
    WriterConfig,
};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use graph_client::RemoteGraphSource;
pub use routes::{create_web_router, create_worker_router};
pub use state::{AppState, WorkerState};
