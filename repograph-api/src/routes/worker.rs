//! Graph Worker Endpoint
//!
//! The isolated worker exposes a single call, `POST /graph` with a JSON body
//! `{repo, cluster}`. It answers 200 with the graph description as plain
//! text, or 500 with a plain-text message. Malformed bodies are rejected by
//! the JSON extractor with a 4xx.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use repograph_core::RepoId;
use serde::{Deserialize, Serialize};

use crate::constants::TEXT_CONTENT_TYPE;
use crate::state::WorkerState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphRequest {
    pub repo: RepoId,
    #[serde(default)]
    pub cluster: bool,
}

/// POST /graph
pub async fn generate_graph(
    State(state): State<WorkerState>,
    Json(request): Json<GraphRequest>,
) -> Response {
    tracing::info!(repo = %request.repo, cluster = request.cluster, "Generating graph");

    match state
        .source
        .generate_graph(&request.repo, request.cluster)
        .await
    {
        Ok(graph) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            graph,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(repo = %request.repo, cluster = request.cluster, error = %e, "Graph generation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                e.to_string(),
            )
                .into_response()
        }
    }
}

pub fn create_router(state: WorkerState) -> Router {
    Router::new()
        .route("/graph", post(generate_graph))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request: GraphRequest =
            serde_json::from_str(r#"{"repo":"example.org/pkg","cluster":true}"#).unwrap();
        assert_eq!(request.repo.as_str(), "example.org/pkg");
        assert!(request.cluster);

        let request: GraphRequest = serde_json::from_str(r#"{"repo":"example.org/pkg"}"#).unwrap();
        assert!(!request.cluster);
    }

    #[test]
    fn test_request_rejects_invalid_repo() {
        let result = serde_json::from_str::<GraphRequest>(r#"{"repo":"a+b","cluster":false}"#);
        assert!(result.is_err());
    }
}
