//! Client for the isolated graph worker.
//!
//! In `web` mode the front service does not materialize or extract anything
//! itself. A graph-tier miss becomes one `POST /graph` to the worker.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use repograph_core::{GraphSource, RepoId, RepographError, RepographResult};

use crate::constants::DEFAULT_GRAPH_ADDR;
use crate::routes::worker::GraphRequest;
use crate::telemetry::metrics;

/// Base URL for a worker at `addr`.
///
/// Only the local default address is contacted over plain http.
pub fn worker_base_url(addr: &str) -> String {
    let addr = addr.trim_end_matches('/');
    if addr == DEFAULT_GRAPH_ADDR {
        format!("http://{}", addr)
    } else {
        format!("https://{}", addr)
    }
}

/// `GraphSource` backed by the graph worker service.
#[derive(Debug, Clone)]
pub struct RemoteGraphSource {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteGraphSource {
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self::with_client(client, worker_base_url(addr)))
    }

    /// Use an explicit client and base URL, e.g. `http://127.0.0.1:41234`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            endpoint: format!("{}/graph", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, repo: &RepoId, cluster: bool) -> RepographResult<String> {
        let request = GraphRequest {
            repo: repo.clone(),
            cluster,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| RepographError::extraction(repo, format!("graph worker unreachable: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            RepographError::extraction(repo, format!("failed to read graph worker response: {}", e))
        })?;

        if status != reqwest::StatusCode::OK {
            return Err(RepographError::extraction(
                repo,
                format!("graph worker returned {}: {}", status.as_u16(), body.trim()),
            ));
        }
        if body.trim().is_empty() {
            return Err(RepographError::extraction(
                repo,
                "graph worker returned an empty graph",
            ));
        }

        Ok(body)
    }
}

#[async_trait]
impl GraphSource for RemoteGraphSource {
    async fn generate_graph(&self, repo: &RepoId, cluster: bool) -> RepographResult<String> {
        let start = Instant::now();
        tracing::debug!(repo = %repo, cluster, endpoint = %self.endpoint, "Requesting graph from worker");

        let result = self.call(repo, cluster).await;

        if let Some(metrics) = metrics() {
            metrics.record_graph_worker_call(result.is_ok(), start.elapsed().as_secs_f64());
        }
        if let Err(e) = &result {
            tracing::warn!(repo = %repo, cluster, error = %e, "Graph worker call failed");
        }

        result
    }
}
