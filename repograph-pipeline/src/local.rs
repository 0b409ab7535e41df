//! In-process graph source: directory tier, materialization and extraction.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use repograph_core::{GraphExtractor, GraphSource, RepoId, RepographResult, SourceMaterializer};
use repograph_storage::{CacheStore, CacheWriter, TierKey, WriteOp};

/// Produces graph descriptions by materializing sources locally.
///
/// Source trees are remembered in the directory tier. A remembered tree is
/// re-checked on disk before use because temp-space cleanup can reclaim it
/// without touching the cache. When extraction fails the directory entry is
/// evicted so the next attempt materializes again.
pub struct LocalGraphSource {
    store: Arc<dyn CacheStore>,
    writer: CacheWriter,
    materializer: Arc<dyn SourceMaterializer>,
    extractor: Arc<dyn GraphExtractor>,
}

impl LocalGraphSource {
    pub fn new(
        store: Arc<dyn CacheStore>,
        writer: CacheWriter,
        materializer: Arc<dyn SourceMaterializer>,
        extractor: Arc<dyn GraphExtractor>,
    ) -> Self {
        Self {
            store,
            writer,
            materializer,
            extractor,
        }
    }

    /// A verified local source tree for `repo`.
    pub async fn source_dir(&self, repo: &RepoId) -> RepographResult<PathBuf> {
        let key = TierKey::directory(repo);

        match self.store.get(&key).await {
            Ok(Some(dir)) => {
                let path = PathBuf::from(&dir);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    tracing::debug!(repo = %repo, path = %dir, "Directory cache hit");
                    return Ok(path);
                }
                tracing::debug!(repo = %repo, path = %dir, "Cached directory no longer exists");
            }
            Ok(None) => tracing::debug!(repo = %repo, "Directory cache miss"),
            Err(e) => tracing::warn!(repo = %repo, error = %e, "Directory cache lookup failed"),
        }

        let source = self.materializer.materialize(repo).await?;

        self.writer
            .submit(WriteOp::set(key, source.path.display().to_string()))
            .await;
        if let Some(version) = source.version {
            self.writer
                .submit(WriteOp::set(TierKey::version(repo), version))
                .await;
        }

        Ok(source.path)
    }
}

#[async_trait]
impl GraphSource for LocalGraphSource {
    async fn generate_graph(&self, repo: &RepoId, cluster: bool) -> RepographResult<String> {
        let dir = self.source_dir(repo).await?;

        match self.extractor.extract(repo, &dir, cluster).await {
            Ok(graph) => Ok(graph),
            Err(e) => {
                tracing::warn!(
                    repo = %repo,
                    cluster,
                    path = %dir.display(),
                    error = %e,
                    "Extraction failed, evicting directory entry"
                );
                self.writer
                    .submit(WriteOp::delete(TierKey::directory(repo)))
                    .await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_storage::InMemoryCacheStore;
    use repograph_test_utils::{StubExtractor, StubMaterializer};
    use tempfile::TempDir;

    struct Fixture {
        store: Arc<InMemoryCacheStore>,
        materializer: Arc<StubMaterializer>,
        extractor: Arc<StubExtractor>,
        source: LocalGraphSource,
        _work: TempDir,
    }

    fn fixture() -> Fixture {
        let work = TempDir::new().unwrap();
        let store = Arc::new(InMemoryCacheStore::new());
        let materializer = Arc::new(StubMaterializer::new(work.path()).with_version("v1"));
        let extractor = Arc::new(StubExtractor::new("digraph{a->b}"));
        let source = LocalGraphSource::new(
            store.clone(),
            CacheWriter::blocking(store.clone()),
            materializer.clone(),
            extractor.clone(),
        );
        Fixture {
            store,
            materializer,
            extractor,
            source,
            _work: work,
        }
    }

    fn repo() -> RepoId {
        RepoId::parse("example.org/pkg").unwrap()
    }

    #[tokio::test]
    async fn test_miss_materializes_and_records_directory_and_version() {
        let f = fixture();
        let graph = f.source.generate_graph(&repo(), false).await.unwrap();

        assert_eq!(graph, "digraph{a->b}");
        assert_eq!(f.materializer.calls(), 1);
        let dir = f.store.get(&TierKey::directory(&repo())).await.unwrap().unwrap();
        assert!(PathBuf::from(dir).exists());
        assert_eq!(
            f.store.get(&TierKey::version(&repo())).await.unwrap().as_deref(),
            Some("v1")
        );
    }

    #[tokio::test]
    async fn test_cached_directory_is_reused() {
        let f = fixture();
        f.source.generate_graph(&repo(), false).await.unwrap();
        f.source.generate_graph(&repo(), true).await.unwrap();

        assert_eq!(f.materializer.calls(), 1);
        assert_eq!(f.extractor.calls(), 2);
    }

    #[tokio::test]
    async fn test_vanished_directory_is_rematerialized() {
        let f = fixture();
        f.store
            .set(&TierKey::directory(&repo()), "/nonexistent/repograph/tree")
            .await
            .unwrap();

        f.source.generate_graph(&repo(), false).await.unwrap();
        assert_eq!(f.materializer.calls(), 1);
        let dir = f.store.get(&TierKey::directory(&repo())).await.unwrap().unwrap();
        assert_ne!(dir, "/nonexistent/repograph/tree");
    }

    #[tokio::test]
    async fn test_extraction_failure_evicts_directory() {
        let f = fixture();
        f.source.generate_graph(&repo(), false).await.unwrap();
        assert!(f.store.get(&TierKey::directory(&repo())).await.unwrap().is_some());

        f.extractor.fail_with("matched no packages");
        assert!(f.source.generate_graph(&repo(), false).await.is_err());
        assert!(f.store.get(&TierKey::directory(&repo())).await.unwrap().is_none());

        f.extractor.succeed();
        f.source.generate_graph(&repo(), false).await.unwrap();
        assert_eq!(f.materializer.calls(), 2);
    }

    #[tokio::test]
    async fn test_materialization_failure_writes_nothing() {
        let f = fixture();
        f.materializer.fail_with("clone failed");

        assert!(f.source.generate_graph(&repo(), false).await.is_err());
        assert_eq!(f.extractor.calls(), 0);
        assert!(f.store.get(&TierKey::directory(&repo())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_outage_still_generates() {
        let f = fixture();
        f.store.set_unavailable(true);
        let graph = f.source.generate_graph(&repo(), false).await.unwrap();
        assert_eq!(graph, "digraph{a->b}");
    }
}
