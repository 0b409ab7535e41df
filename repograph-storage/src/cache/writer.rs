//! Background cache writes.
//!
//! Cache population is decoupled from the response path. Callers submit a
//! [`WriteOp`] and move on; in detached mode a single worker task drains a
//! bounded queue and applies each write to the store. Failures are logged
//! and counted, never returned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use repograph_core::RepoId;
use tokio::sync::{mpsc, oneshot};

use super::tier_key::TierKey;
use super::traits::CacheStore;

/// A single best-effort cache mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: TierKey, value: String },
    Delete { key: TierKey },
    IncrementScore { repo: RepoId },
}

impl WriteOp {
    pub fn set(key: TierKey, value: impl Into<String>) -> Self {
        WriteOp::Set {
            key,
            value: value.into(),
        }
    }

    pub fn delete(key: TierKey) -> Self {
        WriteOp::Delete { key }
    }

    pub fn increment_score(repo: &RepoId) -> Self {
        WriteOp::IncrementScore { repo: repo.clone() }
    }

    fn describe(&self) -> String {
        match self {
            WriteOp::Set { key, .. } => format!("set {key}"),
            WriteOp::Delete { key } => format!("delete {key}"),
            WriteOp::IncrementScore { repo } => format!("increment score {repo}"),
        }
    }
}

/// How submitted writes are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Queue the write for the background worker and return immediately.
    Detached,
    /// Apply the write before `submit` returns. For deterministic tests.
    Blocking,
}

enum Envelope {
    Write(WriteOp),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct WriterCounters {
    dropped: AtomicU64,
    failed: AtomicU64,
}

enum Dispatch {
    Queue(mpsc::Sender<Envelope>),
    Inline(Arc<dyn CacheStore>),
}

/// Handle for submitting background cache writes. Cheap to clone.
#[derive(Clone)]
pub struct CacheWriter {
    dispatch: Arc<Dispatch>,
    counters: Arc<WriterCounters>,
}

impl CacheWriter {
    /// Spawn the background worker and return a detached writer.
    ///
    /// Must be called from within a tokio runtime. At most `capacity` writes
    /// may be pending; further writes are dropped.
    pub fn detached(store: Arc<dyn CacheStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(WriterCounters::default());
        tokio::spawn(run_worker(store, rx, counters.clone()));

        Self {
            dispatch: Arc::new(Dispatch::Queue(tx)),
            counters,
        }
    }

    /// A writer that applies every write inline.
    pub fn blocking(store: Arc<dyn CacheStore>) -> Self {
        Self {
            dispatch: Arc::new(Dispatch::Inline(store)),
            counters: Arc::new(WriterCounters::default()),
        }
    }

    pub fn mode(&self) -> WriteMode {
        match self.dispatch.as_ref() {
            Dispatch::Queue(_) => WriteMode::Detached,
            Dispatch::Inline(_) => WriteMode::Blocking,
        }
    }

    /// Submit a write. Never fails and, in detached mode, never waits.
    pub async fn submit(&self, op: WriteOp) {
        match self.dispatch.as_ref() {
            Dispatch::Queue(tx) => {
                if let Err(e) = tx.try_send(Envelope::Write(op)) {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    let reason = match &e {
                        mpsc::error::TrySendError::Full(_) => "queue full",
                        mpsc::error::TrySendError::Closed(_) => "writer closed",
                    };
                    if let Envelope::Write(op) = e.into_inner() {
                        tracing::warn!(op = %op.describe(), reason, "Dropped cache write");
                    }
                }
            }
            Dispatch::Inline(store) => apply(store.as_ref(), op, &self.counters).await,
        }
    }

    /// Wait until every write submitted before this call has been applied.
    pub async fn flush(&self) {
        if let Dispatch::Queue(tx) = self.dispatch.as_ref() {
            let (done_tx, done_rx) = oneshot::channel();
            if tx.send(Envelope::Flush(done_tx)).await.is_ok() {
                let _ = done_rx.await;
            }
        }
    }

    /// Writes discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Writes the store rejected.
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for CacheWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriter")
            .field("mode", &self.mode())
            .field("dropped", &self.dropped())
            .field("failed", &self.failed())
            .finish()
    }
}

async fn run_worker(
    store: Arc<dyn CacheStore>,
    mut rx: mpsc::Receiver<Envelope>,
    counters: Arc<WriterCounters>,
) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Write(op) => apply(store.as_ref(), op, &counters).await,
            Envelope::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Cache writer stopped");
}

async fn apply(store: &dyn CacheStore, op: WriteOp, counters: &WriterCounters) {
    let result = match &op {
        WriteOp::Set { key, value } => store.set(key, value).await,
        WriteOp::Delete { key } => store.delete(key).await.map(|_| ()),
        WriteOp::IncrementScore { repo } => store.increment_score(repo).await.map(|_| ()),
    };

    if let Err(e) = result {
        counters.failed.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(op = %op.describe(), error = %e, "Cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::InMemoryCacheStore;

    fn repo(s: &str) -> RepoId {
        RepoId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_blocking_applies_inline() {
        let store = Arc::new(InMemoryCacheStore::new());
        let writer = CacheWriter::blocking(store.clone());
        let key = TierKey::graph(&repo("a.org/x"), false);

        writer.submit(WriteOp::set(key.clone(), "digraph{}")).await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("digraph{}"));

        writer.submit(WriteOp::delete(key.clone())).await;
        assert!(store.get(&key).await.unwrap().is_none());
        assert_eq!(writer.mode(), WriteMode::Blocking);
    }

    #[tokio::test]
    async fn test_detached_applies_after_flush() {
        let store = Arc::new(InMemoryCacheStore::new());
        let writer = CacheWriter::detached(store.clone(), 16);
        let r = repo("a.org/x");

        for _ in 0..3 {
            writer.submit(WriteOp::increment_score(&r)).await;
        }
        writer.flush().await;

        let top = store.top_k(1).await.unwrap();
        assert_eq!(top[0].score, 3);
        assert_eq!(writer.dropped(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_without_blocking() {
        let store = Arc::new(InMemoryCacheStore::new());
        let writer = CacheWriter::detached(store.clone(), 2);
        let r = repo("a.org/x");

        // The worker cannot run until this task yields, so the queue fills.
        for _ in 0..5 {
            writer.submit(WriteOp::increment_score(&r)).await;
        }
        assert_eq!(writer.dropped(), 3);

        writer.flush().await;
        assert_eq!(store.top_k(1).await.unwrap()[0].score, 2);
    }

    #[tokio::test]
    async fn test_store_failures_are_counted_not_returned() {
        let store = Arc::new(InMemoryCacheStore::new());
        store.set_unavailable(true);
        let writer = CacheWriter::blocking(store.clone());

        writer
            .submit(WriteOp::set(TierKey::directory(&repo("a.org/x")), "/tmp/x"))
            .await;
        assert_eq!(writer.failed(), 1);
    }
}
