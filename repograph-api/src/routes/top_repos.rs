//! Popularity Endpoint
//!
//! `GET /top-repos` returns the most requested repositories as a JSON array
//! of identities, most popular first.

use axum::{extract::State, routing::get, Json, Router};
use repograph_core::RepoId;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /top-repos
pub async fn top_repos(State(state): State<AppState>) -> ApiResult<Json<Vec<RepoId>>> {
    let repos = state.orchestrator.top_popular(state.top_repos_limit).await?;
    Ok(Json(repos))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/top-repos", get(top_repos))
        .with_state(state)
}
