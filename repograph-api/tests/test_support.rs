//! Shared fixtures for router integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use repograph_api::{create_web_router, create_worker_router, AppState, ServerConfig, WorkerState};
use repograph_pipeline::{LocalGraphSource, Orchestrator};
use repograph_test_utils::fixtures::EXAMPLE_GRAPH;
use repograph_test_utils::{
    CacheStore, CacheWriter, RecordingCacheStore, StubExtractor, StubGraphSource,
    StubMaterializer, StubRenderer,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// A front service wired in-process with stub collaborators.
///
/// Cache writes are applied inline so assertions see them immediately.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<RecordingCacheStore>,
    pub materializer: Arc<StubMaterializer>,
    pub extractor: Arc<StubExtractor>,
    pub renderer: Arc<StubRenderer>,
    _work_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let work_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = Arc::new(RecordingCacheStore::new());
        let shared: Arc<dyn CacheStore> = store.clone();
        let writer = CacheWriter::blocking(shared.clone());

        let materializer = Arc::new(StubMaterializer::new(work_dir.path()).with_version("abc123"));
        let extractor = Arc::new(StubExtractor::new(EXAMPLE_GRAPH));
        let renderer = Arc::new(StubRenderer::new());

        let source = LocalGraphSource::new(
            shared.clone(),
            writer.clone(),
            materializer.clone(),
            extractor.clone(),
        );
        let orchestrator = Orchestrator::new(shared, writer, Arc::new(source), renderer.clone());
        let state = AppState::new(Arc::new(orchestrator), config.top_repos_limit);

        Self {
            router: create_web_router(state, &config),
            store,
            materializer,
            extractor,
            renderer,
            _work_dir: work_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should not fail")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).expect("valid request"))
            .await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.send(Request::post(uri).body(Body::empty()).expect("valid request"))
            .await
    }
}

/// A graph worker router backed by a stub graph source.
pub fn worker_app() -> (Router, Arc<StubGraphSource>) {
    let source = Arc::new(StubGraphSource::new());
    let store: Arc<dyn CacheStore> = Arc::new(RecordingCacheStore::new());
    let router = create_worker_router(WorkerState::new(source.clone()), store);
    (router, source)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
}

pub fn content_type(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
