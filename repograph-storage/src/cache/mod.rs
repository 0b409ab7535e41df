//! Cache tiers and the background write facility.
//!
//! # Tiers
//!
//! | Tier | Key | Value |
//! |---|---|---|
//! | `repodir` | repository | local source tree path |
//! | `version` | repository | checked out revision |
//! | `dot` | repository + cluster | graph description |
//! | `svg` | repository + cluster | rendered image |
//!
//! Popularity scores live outside the tiers in their own sorted collection.
//!
//! # Advisory entries
//!
//! Nothing here is authoritative. Any entry may vanish at any time and the
//! pipeline must be able to rebuild it, so store failures are logged by
//! callers and treated as misses.

pub mod lmdb;
pub mod memory;
pub mod tier_key;
pub mod traits;
pub mod writer;

pub use lmdb::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use tier_key::{Tier, TierKey};
pub use traits::{rank_top_k, CacheStats, CacheStore, ScoredRepo};
pub use writer::{CacheWriter, WriteMode, WriteOp};
