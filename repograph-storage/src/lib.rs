//! Repograph Storage - Cache Tiers
//!
//! One logical key-value store with a namespace per tier plus one sorted
//! collection of popularity scores. Two stores are provided: LMDB for
//! production and an in-memory store for tests and ephemeral deployments.
//! Writes issued from the request path go through [`CacheWriter`].

pub mod cache;

pub use cache::{
    rank_top_k, CacheStats, CacheStore, CacheWriter, InMemoryCacheStore, LmdbCacheError,
    LmdbCacheStore, ScoredRepo, Tier, TierKey, WriteMode, WriteOp,
};
