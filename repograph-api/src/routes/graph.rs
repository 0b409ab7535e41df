//! Artifact Endpoints
//!
//! `GET /graph/{repo}.svg` and `GET /graph/{repo}.dot` serve the rendered
//! image or graph description. `POST` on the same paths refreshes the
//! repository first. `?cluster=true` selects the clustered variant.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use repograph_core::{ArtifactFormat, RepoId};
use repograph_pipeline::Orchestrator;
use serde::Deserialize;

use crate::constants::CLUSTER_ENABLED_VALUE;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::telemetry::metrics;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQuery {
    pub cluster: Option<String>,
}

impl GraphQuery {
    /// Only the literal `true` enables clustering.
    pub fn cluster(&self) -> bool {
        self.cluster.as_deref() == Some(CLUSTER_ENABLED_VALUE)
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /graph/{repo}.{svg|dot}
pub async fn get_artifact(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(path): Path<String>,
    Query(query): Query<GraphQuery>,
) -> ApiResult<Response> {
    serve_artifact(&orchestrator, &path, query.cluster(), false).await
}

/// POST /graph/{repo}.{svg|dot} - refresh, then serve
pub async fn refresh_artifact(
    State(orchestrator): State<Arc<Orchestrator>>,
    Path(path): Path<String>,
    Query(query): Query<GraphQuery>,
) -> ApiResult<Response> {
    serve_artifact(&orchestrator, &path, query.cluster(), true).await
}

async fn serve_artifact(
    orchestrator: &Orchestrator,
    path: &str,
    cluster: bool,
    refresh: bool,
) -> ApiResult<Response> {
    let (repo, format) =
        ArtifactFormat::split_path(path).ok_or_else(|| ApiError::invalid_format(path))?;
    let repo = RepoId::parse(repo)?;

    if refresh {
        orchestrator.refresh(&repo).await;
    }

    let label = format.to_string();
    match orchestrator.resolve(&repo, cluster, format).await {
        Ok(artifact) => {
            if let Some(metrics) = metrics() {
                metrics.record_artifact(&label, artifact.origin.as_str());
            }
            orchestrator.record_popularity(&repo).await;

            tracing::debug!(
                repo = %repo,
                cluster,
                format = %format,
                origin = artifact.origin.as_str(),
                "Served artifact"
            );

            Ok(([(header::CONTENT_TYPE, format.content_type())], artifact.body).into_response())
        }
        Err(e) => {
            if let Some(metrics) = metrics() {
                metrics.record_artifact(&label, "error");
            }
            tracing::error!(repo = %repo, cluster, format = %format, error = %e, "Artifact generation failed");
            Err(ApiError::artifact_failed(&repo, format, e))
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Handlers extract the orchestrator from `AppState` through `FromRef`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/graph/*path", get(get_artifact).post(refresh_artifact))
        .with_state(state)
}
