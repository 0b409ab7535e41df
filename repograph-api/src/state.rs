//! Shared application state for Axum routers.

use std::sync::Arc;

use repograph_core::GraphSource;
use repograph_pipeline::Orchestrator;
use repograph_storage::CacheStore;

/// State of the front service.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Same handle the orchestrator uses. The health router checks it.
    pub store: Arc<dyn CacheStore>,
    pub top_repos_limit: usize,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, top_repos_limit: usize) -> Self {
        Self {
            store: orchestrator.store().clone(),
            orchestrator,
            top_repos_limit,
        }
    }
}

crate::impl_from_ref!(Arc<Orchestrator>, orchestrator);

/// State of the isolated graph worker.
#[derive(Clone)]
pub struct WorkerState {
    pub source: Arc<dyn GraphSource>,
}

impl WorkerState {
    pub fn new(source: Arc<dyn GraphSource>) -> Self {
        Self { source }
    }
}
