//! In-memory cache store.
//!
//! Used by tests and by deployments configured with the `memory` backend.
//! State is lost on restart, which is acceptable since every entry can be
//! rebuilt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use repograph_core::{CacheError, RepoId, RepographResult};

use super::tier_key::{Tier, TierKey};
use super::traits::{rank_top_k, CacheStats, CacheStore, ScoredRepo};

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<TierKey, String>,
    scores: HashMap<RepoId, u64>,
}

/// Cache store backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    inner: RwLock<MemoryInner>,
    unavailable: AtomicBool,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`CacheError::Unavailable`]
    /// until reset. Simulates an outage of the backing store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                reason: "in-memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryInner>, CacheError> {
        self.check_available()?;
        self.inner.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryInner>, CacheError> {
        self.check_available()?;
        self.inner.write().map_err(|_| CacheError::LockPoisoned)
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &TierKey) -> RepographResult<Option<String>> {
        Ok(self.read()?.entries.get(key).cloned())
    }

    async fn set(&self, key: &TierKey, value: &str) -> RepographResult<()> {
        self.write()?.entries.insert(key.clone(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &TierKey) -> RepographResult<u64> {
        Ok(self.write()?.entries.remove(key).map_or(0, |_| 1))
    }

    async fn increment_score(&self, repo: &RepoId) -> RepographResult<u64> {
        let mut inner = self.write()?;
        let score = inner.scores.entry(repo.clone()).or_insert(0);
        *score += 1;
        Ok(*score)
    }

    async fn top_k(&self, k: usize) -> RepographResult<Vec<ScoredRepo>> {
        let scored = self
            .read()?
            .scores
            .iter()
            .map(|(repo, score)| ScoredRepo {
                repo: repo.clone(),
                score: *score,
            })
            .collect();
        Ok(rank_top_k(scored, k))
    }

    async fn count(&self, tier: Tier) -> RepographResult<u64> {
        Ok(self
            .read()?
            .entries
            .keys()
            .filter(|key| key.tier() == tier)
            .count() as u64)
    }

    async fn stats(&self) -> RepographResult<CacheStats> {
        let inner = self.read()?;
        Ok(CacheStats {
            entry_count: inner.entries.len() as u64,
            scored_repos: inner.scores.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::RepographError;

    fn repo(s: &str) -> RepoId {
        RepoId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_delete() -> Result<(), String> {
        let store = InMemoryCacheStore::new();
        let key = TierKey::graph(&repo("example.org/pkg"), false);

        assert_eq!(store.get(&key).await.map_err(|e| e.to_string())?, None);
        store.set(&key, "digraph{}").await.map_err(|e| e.to_string())?;
        assert_eq!(
            store.get(&key).await.map_err(|e| e.to_string())?.as_deref(),
            Some("digraph{}")
        );

        // the other cluster slot is independent
        let other = TierKey::graph(&repo("example.org/pkg"), true);
        assert_eq!(store.get(&other).await.map_err(|e| e.to_string())?, None);

        assert_eq!(store.delete(&key).await.map_err(|e| e.to_string())?, 1);
        assert_eq!(store.delete(&key).await.map_err(|e| e.to_string())?, 0);

        let stats = store.stats().await.map_err(|e| e.to_string())?;
        assert_eq!(stats.entry_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_scores_and_top_k() {
        let store = InMemoryCacheStore::new();
        let popular = repo("a.org/popular");
        let other = repo("b.org/other");

        for _ in 0..5 {
            store.increment_score(&popular).await.unwrap();
        }
        for _ in 0..2 {
            store.increment_score(&other).await.unwrap();
        }
        assert_eq!(store.increment_score(&other).await.unwrap(), 3);

        let top = store.top_k(10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].repo, popular);
        assert_eq!(top[0].score, 5);
        assert_eq!(top[1].repo, other);

        assert_eq!(store.top_k(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_count_per_tier() {
        let store = InMemoryCacheStore::new();
        let r = repo("a.org/x");
        store.set(&TierKey::directory(&r), "/tmp/x").await.unwrap();
        store.set(&TierKey::image(&r, true), "<svg/>").await.unwrap();
        store.set(&TierKey::image(&r, false), "<svg/>").await.unwrap();

        assert_eq!(store.count(Tier::Directory).await.unwrap(), 1);
        assert_eq!(store.count(Tier::Image).await.unwrap(), 2);
        assert_eq!(store.count(Tier::Graph).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = InMemoryCacheStore::new();
        let key = TierKey::directory(&repo("a.org/x"));
        store.set_unavailable(true);

        assert!(matches!(
            store.get(&key).await,
            Err(RepographError::Cache(CacheError::Unavailable { .. }))
        ));
        assert!(store.set(&key, "v").await.is_err());
        assert!(store.top_k(3).await.is_err());

        store.set_unavailable(false);
        assert!(store.set(&key, "v").await.is_ok());
    }
}
