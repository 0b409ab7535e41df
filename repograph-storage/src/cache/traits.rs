//! Cache store trait and statistics.

use async_trait::async_trait;
use repograph_core::{RepoId, RepographResult};

use super::tier_key::{Tier, TierKey};

/// A repository together with its popularity score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredRepo {
    pub repo: RepoId,
    pub score: u64,
}

/// Key-value store with one namespace per tier plus a sorted collection of
/// popularity scores.
///
/// Implementations must be safe for concurrent use. No operation is
/// transactional across keys; concurrent writers to one key race and the
/// last write wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &TierKey) -> RepographResult<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &TierKey, value: &str) -> RepographResult<()>;

    /// Remove `key`. Returns the number of entries removed (0 or 1).
    async fn delete(&self, key: &TierKey) -> RepographResult<u64>;

    /// Increment the popularity score of `repo`, creating it at 1.
    ///
    /// Returns the new score.
    async fn increment_score(&self, repo: &RepoId) -> RepographResult<u64>;

    /// Up to `k` repositories by descending score, ties broken by ascending
    /// repository identity.
    async fn top_k(&self, k: usize) -> RepographResult<Vec<ScoredRepo>>;

    /// Number of entries currently stored in `tier`.
    async fn count(&self, tier: Tier) -> RepographResult<u64>;

    /// Get cache statistics.
    async fn stats(&self) -> RepographResult<CacheStats>;
}

/// Order scored repositories by descending score then ascending identity
/// and keep the first `k`.
pub fn rank_top_k(mut scored: Vec<ScoredRepo>, k: usize) -> Vec<ScoredRepo> {
    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.repo.cmp(&b.repo)));
    scored.truncate(k);
    scored
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tier entries currently stored.
    pub entry_count: u64,
    /// Number of repositories with a popularity score.
    pub scored_repos: u64,
}
