//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB). Two named databases live in
//! one environment:
//! - `tiers`: every tier entry, keyed by [`TierKey::encode`]
//! - `scores`: repository identity -> popularity score (u64, little endian)
//!
//! The environment is safe to open from several processes on one host, so
//! the front service and the graph worker can share it.

use std::path::Path;

use async_trait::async_trait;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use repograph_core::{CacheError, RepoId, RepographError, RepographResult};

use super::tier_key::{Tier, TierKey};
use super::traits::{rank_top_k, CacheStats, CacheStore, ScoredRepo};

const TIERS_DB: &str = "tiers";
const SCORES_DB: &str = "scores";

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open a database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes could not be decoded.
    #[error("Corrupt entry {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for RepographError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Corrupt { key, reason } => {
                RepographError::Cache(CacheError::Corrupt { key, reason })
            }
            other => RepographError::Cache(CacheError::Unavailable {
                reason: other.to_string(),
            }),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// Persistent cache store on LMDB.
pub struct LmdbCacheStore {
    env: Env,
    tiers: Database<Bytes, Bytes>,
    scores: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(2)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;

        let tiers: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(TIERS_DB))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        let scores: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, Some(SCORES_DB))
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit().map_err(txn_err)?;

        Ok(Self { env, tiers, scores })
    }

    /// Count the entries under `tier`, failing on any key that does not
    /// decode.
    fn count_tier(&self, tier: Tier) -> Result<u64, LmdbCacheError> {
        let prefix = tier.prefix();
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self
            .tiers
            .prefix_iter(&rtxn, &prefix[..])
            .map_err(txn_err)?;

        let mut count = 0u64;
        for result in iter {
            let (key, _) = result.map_err(txn_err)?;
            if TierKey::decode(key).is_none() {
                return Err(LmdbCacheError::Corrupt {
                    key: String::from_utf8_lossy(key).to_string(),
                    reason: format!("malformed {} key", tier.name()),
                });
            }
            count += 1;
        }
        Ok(count)
    }

    fn read_scores(&self) -> Result<Vec<ScoredRepo>, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let iter = self.scores.iter(&rtxn).map_err(txn_err)?;

        let mut scored = Vec::new();
        for result in iter {
            let (key, value) = result.map_err(txn_err)?;
            let name = String::from_utf8_lossy(key).to_string();
            let repo = RepoId::parse(&name).map_err(|e| LmdbCacheError::Corrupt {
                key: name.clone(),
                reason: e.to_string(),
            })?;
            scored.push(ScoredRepo {
                repo,
                score: decode_score(&name, value)?,
            });
        }
        Ok(scored)
    }
}

fn decode_score(key: &str, bytes: &[u8]) -> Result<u64, LmdbCacheError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| LmdbCacheError::Corrupt {
        key: key.to_string(),
        reason: format!("score has {} bytes, expected 8", bytes.len()),
    })?;
    Ok(u64::from_le_bytes(raw))
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &TierKey) -> RepographResult<Option<String>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;

        match self.tiers.get(&rtxn, &key.encode()).map_err(txn_err)? {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    LmdbCacheError::Corrupt {
                        key: key.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &TierKey, value: &str) -> RepographResult<()> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.tiers
            .put(&mut wtxn, &key.encode(), value.as_bytes())
            .map_err(|e| CacheError::WriteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn delete(&self, key: &TierKey) -> RepographResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.tiers.delete(&mut wtxn, &key.encode()).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(u64::from(deleted))
    }

    async fn increment_score(&self, repo: &RepoId) -> RepographResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let name = repo.as_str().as_bytes();

        let current = match self.scores.get(&wtxn, name).map_err(txn_err)? {
            Some(bytes) => decode_score(repo.as_str(), bytes)?,
            None => 0,
        };
        let next = current + 1;

        self.scores
            .put(&mut wtxn, name, &next.to_le_bytes())
            .map_err(|e| CacheError::WriteFailed {
                key: format!("scores:{repo}"),
                reason: e.to_string(),
            })?;
        wtxn.commit().map_err(txn_err)?;
        Ok(next)
    }

    async fn top_k(&self, k: usize) -> RepographResult<Vec<ScoredRepo>> {
        Ok(rank_top_k(self.read_scores()?, k))
    }

    async fn count(&self, tier: Tier) -> RepographResult<u64> {
        Ok(self.count_tier(tier)?)
    }

    async fn stats(&self) -> RepographResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        Ok(CacheStats {
            entry_count: self.tiers.len(&rtxn).map_err(txn_err)?,
            scored_repos: self.scores.len(&rtxn).map_err(txn_err)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn repo(s: &str) -> RepoId {
        RepoId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, _temp_dir) = create_test_store();
        let key = TierKey::image(&repo("example.org/pkg"), true);

        store.set(&key, "<svg/>").await.expect("set should succeed");
        let cached = store.get(&key).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some("<svg/>"));

        // overwritten silently
        store.set(&key, "<svg>2</svg>").await.expect("set should succeed");
        let cached = store.get(&key).await.expect("get should succeed");
        assert_eq!(cached.as_deref(), Some("<svg>2</svg>"));
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        let cached = store
            .get(&TierKey::graph(&repo("example.org/none"), false))
            .await
            .expect("get should succeed");
        assert!(cached.is_none());
    }

    #[tokio::test]
    async fn test_delete_reports_count() {
        let (store, _temp_dir) = create_test_store();
        let key = TierKey::directory(&repo("example.org/pkg"));

        store.set(&key, "/tmp/pkg").await.expect("set should succeed");
        assert_eq!(store.delete(&key).await.expect("delete should succeed"), 1);
        assert_eq!(store.delete(&key).await.expect("delete should succeed"), 0);
        assert!(store.get(&key).await.expect("get should succeed").is_none());
    }

    #[tokio::test]
    async fn test_count_is_per_tier() {
        let (store, _temp_dir) = create_test_store();
        let a = repo("a.org/x");
        let b = repo("b.org/y");

        store.set(&TierKey::graph(&a, false), "g").await.unwrap();
        store.set(&TierKey::graph(&a, true), "g").await.unwrap();
        store.set(&TierKey::graph(&b, false), "g").await.unwrap();
        store.set(&TierKey::directory(&a), "/tmp/a").await.unwrap();

        assert_eq!(store.count(Tier::Graph).await.unwrap(), 3);
        assert_eq!(store.count(Tier::Directory).await.unwrap(), 1);
        assert_eq!(store.count(Tier::Image).await.unwrap(), 0);
        assert_eq!(store.stats().await.unwrap().entry_count, 4);
    }

    #[tokio::test]
    async fn test_count_fails_on_malformed_key() {
        let (store, _temp_dir) = create_test_store();
        store
            .set(&TierKey::graph(&repo("a.org/x"), false), "g")
            .await
            .unwrap();

        let mut bad = Tier::Graph.prefix().to_vec();
        bad.extend_from_slice(b"a.org/x+maybe");
        let mut wtxn = store.env.write_txn().unwrap();
        store.tiers.put(&mut wtxn, bad.as_slice(), &b"g"[..]).unwrap();
        wtxn.commit().unwrap();

        let err = store.count(Tier::Graph).await.unwrap_err();
        assert!(matches!(err, RepographError::Cache(CacheError::Corrupt { .. })));

        // other tiers are unaffected
        assert_eq!(store.count(Tier::Image).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scores_rank_with_tie_break() {
        let (store, _temp_dir) = create_test_store();
        let popular = repo("z.org/popular");
        let tie_a = repo("a.org/tie");
        let tie_b = repo("b.org/tie");

        for _ in 0..5 {
            store.increment_score(&popular).await.unwrap();
        }
        for r in [&tie_b, &tie_a, &tie_b, &tie_a] {
            store.increment_score(r).await.unwrap();
        }

        let top = store.top_k(10).await.unwrap();
        let names: Vec<_> = top.iter().map(|s| (s.repo.as_str(), s.score)).collect();
        assert_eq!(
            names,
            vec![("z.org/popular", 5), ("a.org/tie", 2), ("b.org/tie", 2)]
        );
        assert_eq!(store.stats().await.unwrap().scored_repos, 3);
    }

    #[tokio::test]
    async fn test_scores_survive_tier_deletes() {
        let (store, _temp_dir) = create_test_store();
        let r = repo("a.org/x");
        store.increment_score(&r).await.unwrap();

        for key in TierKey::all_for(&r) {
            store.delete(&key).await.unwrap();
        }
        assert_eq!(store.top_k(1).await.unwrap()[0].score, 1);
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let key = TierKey::version(&repo("a.org/x"));
        {
            let store = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
            store.set(&key, "abc123").await.unwrap();
        }
        let store = LmdbCacheStore::new(temp_dir.path(), 10).unwrap();
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_error_conversion() {
        let err: RepographError = LmdbCacheError::Transaction("boom".into()).into();
        assert!(matches!(
            err,
            RepographError::Cache(CacheError::Unavailable { .. })
        ));

        let err: RepographError = LmdbCacheError::Corrupt {
            key: "k".into(),
            reason: "bad".into(),
        }
        .into();
        assert!(matches!(err, RepographError::Cache(CacheError::Corrupt { .. })));
    }
}
