//! Service assembly.
//!
//! Builds one cache store handle and one background writer per process and
//! passes them explicitly to every component that needs them.

use std::sync::Arc;

use axum::Router;
use repograph_core::{CommandRunner, GraphSource, RepographError};
use repograph_pipeline::{
    DotRenderer, GitMaterializer, GodaExtractor, LocalGraphSource, Orchestrator,
    TokioCommandRunner,
};
use repograph_storage::{CacheStore, CacheWriter, InMemoryCacheStore, LmdbCacheStore};

use crate::config::{AppConfig, CacheBackend, PipelineConfig, ServiceMode, StoreConfig};
use crate::error::{ApiError, ApiResult};
use crate::graph_client::RemoteGraphSource;
use crate::routes::{create_web_router, create_worker_router};
use crate::state::{AppState, WorkerState};

/// Open the configured cache store.
pub fn open_store(config: &StoreConfig) -> ApiResult<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Memory => {
            tracing::info!("Using in-memory cache store");
            Ok(Arc::new(InMemoryCacheStore::new()))
        }
        CacheBackend::Lmdb => {
            tracing::info!(
                path = %config.path.display(),
                max_size_mb = config.max_size_mb,
                "Opening LMDB cache store"
            );
            let store = LmdbCacheStore::new(&config.path, config.max_size_mb)
                .map_err(|e| ApiError::from(RepographError::from(e)))?;
            Ok(Arc::new(store))
        }
    }
}

fn command_runner(config: &PipelineConfig) -> Arc<dyn CommandRunner> {
    Arc::new(TokioCommandRunner::new(Some(config.command_timeout)))
}

/// In-process materialization and extraction.
pub fn local_graph_source(
    store: Arc<dyn CacheStore>,
    writer: CacheWriter,
    config: &PipelineConfig,
) -> LocalGraphSource {
    let runner = command_runner(config);
    let materializer =
        GitMaterializer::new(runner.clone(), &config.work_dir).with_git_bin(&config.git_bin);
    let extractor = GodaExtractor::new(runner).with_goda_bin(&config.goda_bin);

    LocalGraphSource::new(store, writer, Arc::new(materializer), Arc::new(extractor))
}

/// Everything a running process needs.
pub struct Services {
    pub mode: ServiceMode,
    pub router: Router,
    pub store: Arc<dyn CacheStore>,
    pub writer: CacheWriter,
}

/// Wire the services for `config.server.mode`.
///
/// Must be called from within a tokio runtime; the background writer's
/// worker task is spawned here.
pub fn build_services(config: &AppConfig) -> ApiResult<Services> {
    config.validate()?;
    let store = open_store(&config.store)?;
    let writer = CacheWriter::detached(store.clone(), config.writer.queue_capacity);
    let mode = config.server.mode;

    let router = match mode {
        ServiceMode::Graph => {
            let source = local_graph_source(store.clone(), writer.clone(), &config.pipeline);
            create_worker_router(WorkerState::new(Arc::new(source)), store.clone())
        }
        ServiceMode::Web | ServiceMode::Standalone => {
            let source: Arc<dyn GraphSource> = if mode == ServiceMode::Web {
                let remote = RemoteGraphSource::new(
                    &config.server.graph_addr,
                    config.pipeline.command_timeout,
                )
                .map_err(ApiError::internal_error)?;
                tracing::info!(endpoint = %remote.endpoint(), "Delegating graph generation to worker");
                Arc::new(remote)
            } else {
                Arc::new(local_graph_source(
                    store.clone(),
                    writer.clone(),
                    &config.pipeline,
                ))
            };
            let renderer = DotRenderer::new(command_runner(&config.pipeline))
                .with_dot_bin(&config.pipeline.dot_bin);

            let orchestrator = Orchestrator::new(
                store.clone(),
                writer.clone(),
                source,
                Arc::new(renderer),
            );
            let state = AppState::new(Arc::new(orchestrator), config.server.top_repos_limit);
            create_web_router(state, &config.server)
        }
    };

    tracing::info!(mode = mode.as_str(), "Services assembled");

    Ok(Services {
        mode,
        router,
        store,
        writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_storage::Tier;

    fn config_for(mode: ServiceMode, backend: CacheBackend, dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.server.mode = mode;
        config.store.backend = backend;
        config.store.path = dir.path().join(mode.as_str());
        config
    }

    #[tokio::test]
    async fn test_builds_every_mode() {
        let dir = tempfile::TempDir::new().expect("TempDir creation should succeed");
        for (mode, backend) in [
            (ServiceMode::Web, CacheBackend::Lmdb),
            (ServiceMode::Graph, CacheBackend::Lmdb),
            (ServiceMode::Standalone, CacheBackend::Lmdb),
            (ServiceMode::Standalone, CacheBackend::Memory),
        ] {
            let services = build_services(&config_for(mode, backend, &dir)).unwrap();
            assert_eq!(services.mode, mode);
            assert_eq!(services.store.count(Tier::Graph).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_split_modes_refuse_memory_store() {
        let dir = tempfile::TempDir::new().expect("TempDir creation should succeed");
        for mode in [ServiceMode::Web, ServiceMode::Graph] {
            let err = match build_services(&config_for(mode, CacheBackend::Memory, &dir)) {
                Ok(_) => panic!("{} mode accepted a process-local store", mode.as_str()),
                Err(e) => e,
            };
            assert_eq!(err.code, crate::error::ErrorCode::InvalidInput);
        }
    }

    #[tokio::test]
    async fn test_opens_lmdb_store() {
        let dir = tempfile::TempDir::new().expect("TempDir creation should succeed");
        let config = StoreConfig {
            backend: CacheBackend::Lmdb,
            path: dir.path().join("cache"),
            max_size_mb: 16,
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.count(Tier::Image).await.unwrap(), 0);
    }
}
