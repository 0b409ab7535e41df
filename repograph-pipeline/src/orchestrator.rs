//! Pipeline orchestration over the graph and image tiers.

use std::path::PathBuf;
use std::sync::Arc;

use repograph_core::{ArtifactFormat, GraphSource, LayoutRenderer, RepoId, RepographResult};
use repograph_storage::{CacheStore, CacheWriter, TierKey, WriteOp};

/// Where a served artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOrigin {
    /// Returned straight from its tier.
    Cached,
    /// Computed on this request.
    Generated,
}

impl ArtifactOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactOrigin::Cached => "hit",
            ArtifactOrigin::Generated => "miss",
        }
    }
}

/// A graph description or rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub body: String,
    pub origin: ArtifactOrigin,
}

impl Artifact {
    fn cached(body: String) -> Self {
        Self {
            body,
            origin: ArtifactOrigin::Cached,
        }
    }

    fn generated(body: String) -> Self {
        Self {
            body,
            origin: ArtifactOrigin::Generated,
        }
    }
}

/// Resolves artifacts through the cache tiers.
///
/// Each resolution checks its own tier first, delegates on a miss and
/// submits the result to the background writer. Store failures degrade to
/// misses. Concurrent misses for the same key each do the full work.
pub struct Orchestrator {
    store: Arc<dyn CacheStore>,
    writer: CacheWriter,
    source: Arc<dyn GraphSource>,
    renderer: Arc<dyn LayoutRenderer>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CacheStore>,
        writer: CacheWriter,
        source: Arc<dyn GraphSource>,
        renderer: Arc<dyn LayoutRenderer>,
    ) -> Self {
        Self {
            store,
            writer,
            source,
            renderer,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn writer(&self) -> &CacheWriter {
        &self.writer
    }

    async fn lookup(&self, key: &TierKey) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(value)) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }

    /// Graph description for `(repo, cluster)`.
    pub async fn resolve_graph(&self, repo: &RepoId, cluster: bool) -> RepographResult<Artifact> {
        let key = TierKey::graph(repo, cluster);
        if let Some(graph) = self.lookup(&key).await {
            return Ok(Artifact::cached(graph));
        }

        let graph = self.source.generate_graph(repo, cluster).await?;
        self.writer.submit(WriteOp::set(key, graph.clone())).await;

        Ok(Artifact::generated(graph))
    }

    /// Rendered image for `(repo, cluster)`.
    ///
    /// No image entry is written unless rendering succeeds.
    pub async fn resolve_image(&self, repo: &RepoId, cluster: bool) -> RepographResult<Artifact> {
        let key = TierKey::image(repo, cluster);
        if let Some(image) = self.lookup(&key).await {
            return Ok(Artifact::cached(image));
        }

        let graph = self.resolve_graph(repo, cluster).await?;
        let image = self.renderer.render(&graph.body).await.map_err(|e| {
            tracing::warn!(repo = %repo, cluster, error = %e, "Render failed");
            e
        })?;
        self.writer.submit(WriteOp::set(key, image.clone())).await;

        Ok(Artifact::generated(image))
    }

    pub async fn resolve(
        &self,
        repo: &RepoId,
        cluster: bool,
        format: ArtifactFormat,
    ) -> RepographResult<Artifact> {
        match format {
            ArtifactFormat::Svg => self.resolve_image(repo, cluster).await,
            ArtifactFormat::Dot => self.resolve_graph(repo, cluster).await,
        }
    }

    /// Clear every tier for `repo`. Popularity is untouched.
    ///
    /// Pending background writes are flushed first and the deletes are
    /// awaited, so the next resolution for `repo` misses every tier. The
    /// local source tree, if any, is removed in the background.
    pub async fn refresh(&self, repo: &RepoId) {
        self.writer.flush().await;

        let dir = self.lookup(&TierKey::directory(repo)).await;

        for key in TierKey::all_for(repo) {
            match self.store.delete(&key).await {
                Ok(removed) => tracing::debug!(key = %key, removed, "Refresh deleted key"),
                Err(e) => tracing::warn!(key = %key, error = %e, "Refresh failed to delete key"),
            }
        }

        if let Some(dir) = dir {
            tokio::spawn(remove_source_tree(repo.clone(), PathBuf::from(dir)));
        }

        tracing::info!(repo = %repo, "Refreshed repository");
    }

    /// Count one successfully served request for `repo`.
    pub async fn record_popularity(&self, repo: &RepoId) {
        self.writer.submit(WriteOp::increment_score(repo)).await;
    }

    /// Up to `k` repositories, most popular first.
    pub async fn top_popular(&self, k: usize) -> RepographResult<Vec<RepoId>> {
        Ok(self
            .store
            .top_k(k)
            .await?
            .into_iter()
            .map(|scored| scored.repo)
            .collect())
    }
}

async fn remove_source_tree(repo: RepoId, dir: PathBuf) {
    if !dir.is_absolute() {
        tracing::warn!(repo = %repo, path = %dir.display(), "Refusing to remove relative path");
        return;
    }
    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => tracing::debug!(repo = %repo, path = %dir.display(), "Removed source tree"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(repo = %repo, path = %dir.display(), error = %e, "Failed to remove source tree")
        }
    }
}
