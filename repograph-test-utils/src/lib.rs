//! Repograph Test Utilities
//!
//! Shared test infrastructure for the repograph workspace:
//! - Stub collaborators with call counters and failure switches
//! - A scripted command runner for tool adapter tests
//! - A cache store that records every operation
//! - Proptest generators and fixtures

pub use repograph_core::{
    ArtifactFormat, CacheError, CommandError, CommandInvocation, CommandOutput, CommandRunner,
    GraphExtractor, GraphSource, LayoutRenderer, MaterializedSource, RepoId, RepographError,
    RepographResult, SourceMaterializer,
};
pub use repograph_storage::{
    CacheStats, CacheStore, CacheWriter, InMemoryCacheStore, ScoredRepo, Tier, TierKey,
};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// STUB COLLABORATORS
// ============================================================================

/// Materializer that creates real, empty directories under a root.
#[derive(Debug)]
pub struct StubMaterializer {
    root: PathBuf,
    version: Option<String>,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StubMaterializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            version: None,
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Fail every subsequent call with a resolution error.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *lock(&self.failure) = Some(reason.into());
    }

    pub fn succeed(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceMaterializer for StubMaterializer {
    async fn materialize(&self, repo: &RepoId) -> RepographResult<MaterializedSource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&self.failure).clone() {
            return Err(RepographError::resolution(repo, reason));
        }

        let path = self.root.join(Uuid::now_v7().to_string());
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| RepographError::resolution(repo, e))?;

        Ok(MaterializedSource {
            path,
            version: self.version.clone(),
        })
    }
}

/// Extractor returning a fixed graph description.
#[derive(Debug)]
pub struct StubExtractor {
    output: String,
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
    last_source: Mutex<Option<PathBuf>>,
}

impl StubExtractor {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
            last_source: Mutex::new(None),
        }
    }

    /// Fail every subsequent call with an extraction error.
    pub fn fail_with(&self, reason: impl Into<String>) {
        *lock(&self.failure) = Some(reason.into());
    }

    pub fn succeed(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Source tree passed to the most recent call.
    pub fn last_source(&self) -> Option<PathBuf> {
        lock(&self.last_source).clone()
    }
}

#[async_trait]
impl GraphExtractor for StubExtractor {
    async fn extract(&self, repo: &RepoId, source: &Path, _cluster: bool) -> RepographResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_source) = Some(source.to_path_buf());
        if let Some(reason) = lock(&self.failure).clone() {
            return Err(RepographError::extraction(repo, reason));
        }
        Ok(self.output.clone())
    }
}

/// Renderer wrapping the graph as `<svg>{graph}</svg>`.
#[derive(Debug, Default)]
pub struct StubRenderer {
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *lock(&self.failure) = Some(reason.into());
    }

    pub fn succeed(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LayoutRenderer for StubRenderer {
    async fn render(&self, graph: &str) -> RepographResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&self.failure).clone() {
            return Err(RepographError::render(reason));
        }
        Ok(format!("<svg>{graph}</svg>"))
    }
}

/// Graph source returning `digraph{<repo>+<cluster>}`.
#[derive(Debug, Default)]
pub struct StubGraphSource {
    failure: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl StubGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        *lock(&self.failure) = Some(reason.into());
    }

    pub fn succeed(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The graph this stub produces for `(repo, cluster)`.
    pub fn graph_for(repo: &RepoId, cluster: bool) -> String {
        format!("digraph{{{repo}+{cluster}}}")
    }
}

#[async_trait]
impl GraphSource for StubGraphSource {
    async fn generate_graph(&self, repo: &RepoId, cluster: bool) -> RepographResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = lock(&self.failure).clone() {
            return Err(RepographError::extraction(repo, reason));
        }
        Ok(Self::graph_for(repo, cluster))
    }
}

// ============================================================================
// SCRIPTED COMMAND RUNNER
// ============================================================================

struct Rule {
    program: String,
    args: Vec<String>,
    response: Result<CommandOutput, CommandError>,
}

/// Command runner answering from a script instead of spawning processes.
///
/// Rules match on program name and, optionally, on arguments that must all
/// appear in the invocation. The most recently added matching rule wins.
/// Unmatched invocations succeed with empty output.
#[derive(Default)]
pub struct ScriptedCommandRunner {
    rules: Vec<Rule>,
    invocations: Mutex<Vec<CommandInvocation>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, program: &str, response: Result<CommandOutput, CommandError>) -> Self {
        self.on_args(program, &[], response)
    }

    pub fn on_args(
        mut self,
        program: &str,
        args: &[&str],
        response: Result<CommandOutput, CommandError>,
    ) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            response,
        });
        self
    }

    /// Every invocation received so far, in order.
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.invocations).clone()
    }

    pub fn calls(&self, program: &str) -> usize {
        lock(&self.invocations)
            .iter()
            .filter(|inv| inv.program == program)
            .count()
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, invocation: CommandInvocation) -> Result<CommandOutput, CommandError> {
        let response = self
            .rules
            .iter()
            .rev()
            .find(|rule| {
                rule.program == invocation.program
                    && rule.args.iter().all(|arg| invocation.args.contains(arg))
            })
            .map(|rule| rule.response.clone())
            .unwrap_or_else(|| Ok(CommandOutput::default()));

        lock(&self.invocations).push(invocation);
        response
    }
}

// ============================================================================
// RECORDING CACHE STORE
// ============================================================================

/// One operation observed by [`RecordingCacheStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp {
    Get(TierKey),
    Set(TierKey),
    Delete(TierKey),
    IncrementScore(RepoId),
    TopK(usize),
    Count(Tier),
}

/// In-memory store that logs every operation in order.
#[derive(Debug, Default)]
pub struct RecordingCacheStore {
    inner: InMemoryCacheStore,
    ops: Mutex<Vec<CacheOp>>,
}

impl RecordingCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryCacheStore {
        &self.inner
    }

    pub fn ops(&self) -> Vec<CacheOp> {
        lock(&self.ops).clone()
    }

    pub fn clear_ops(&self) {
        lock(&self.ops).clear();
    }

    fn record(&self, op: CacheOp) {
        lock(&self.ops).push(op);
    }
}

#[async_trait]
impl CacheStore for RecordingCacheStore {
    async fn get(&self, key: &TierKey) -> RepographResult<Option<String>> {
        self.record(CacheOp::Get(key.clone()));
        self.inner.get(key).await
    }

    async fn set(&self, key: &TierKey, value: &str) -> RepographResult<()> {
        self.record(CacheOp::Set(key.clone()));
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &TierKey) -> RepographResult<u64> {
        self.record(CacheOp::Delete(key.clone()));
        self.inner.delete(key).await
    }

    async fn increment_score(&self, repo: &RepoId) -> RepographResult<u64> {
        self.record(CacheOp::IncrementScore(repo.clone()));
        self.inner.increment_score(repo).await
    }

    async fn top_k(&self, k: usize) -> RepographResult<Vec<ScoredRepo>> {
        self.record(CacheOp::TopK(k));
        self.inner.top_k(k).await
    }

    async fn count(&self, tier: Tier) -> RepographResult<u64> {
        self.record(CacheOp::Count(tier));
        self.inner.count(tier).await
    }

    async fn stats(&self) -> RepographResult<CacheStats> {
        self.inner.stats().await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for repograph types.

    use super::*;
    use proptest::prelude::*;

    /// Canonical repository identities such as `abc.io/x/y`.
    pub fn arb_repo_id() -> impl Strategy<Value = RepoId> {
        (
            "[a-z]{1,10}\\.(com|org|io)",
            proptest::collection::vec("[A-Za-z0-9_-]{1,12}", 1..4),
        )
            .prop_filter_map("canonical identity", |(host, path)| {
                let raw = std::iter::once(host).chain(path).collect::<Vec<_>>().join("/");
                RepoId::parse(&raw).ok()
            })
    }

    pub fn arb_format() -> impl Strategy<Value = ArtifactFormat> {
        prop_oneof![Just(ArtifactFormat::Svg), Just(ArtifactFormat::Dot)]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made identities and collaborators.

    use super::*;

    pub const EXAMPLE_REPO: &str = "example.org/pkg";
    pub const EXAMPLE_GRAPH: &str = "digraph{\"example.org/pkg\" -> \"fmt\"}";

    pub fn repo(s: &str) -> RepoId {
        match RepoId::parse(s) {
            Ok(repo) => repo,
            Err(e) => panic!("invalid fixture repository {s:?}: {e}"),
        }
    }

    pub fn example_repo() -> RepoId {
        repo(EXAMPLE_REPO)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[tokio::test]
    async fn test_stub_materializer_creates_directories() {
        let root = tempfile::TempDir::new().unwrap();
        let stub = StubMaterializer::new(root.path()).with_version("v9");

        let source = stub.materialize(&example_repo()).await.unwrap();
        assert!(source.path.is_dir());
        assert_eq!(source.version.as_deref(), Some("v9"));

        stub.fail_with("offline");
        assert!(stub.materialize(&example_repo()).await.is_err());
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_runner_prefers_latest_matching_rule() {
        let runner = ScriptedCommandRunner::new()
            .on("git", Ok("generic".into()))
            .on_args("git", &["rev-parse"], Ok("specific".into()));

        let out = runner
            .run(CommandInvocation::new("git").args(["rev-parse", "HEAD"]))
            .await
            .unwrap();
        assert_eq!(out.stdout, "specific");

        let out = runner.run(CommandInvocation::new("git").arg("clone")).await.unwrap();
        assert_eq!(out.stdout, "generic");

        let out = runner.run(CommandInvocation::new("dot")).await.unwrap();
        assert_eq!(out, CommandOutput::default());
        assert_eq!(runner.calls("git"), 2);
    }

    #[tokio::test]
    async fn test_recording_store_logs_operations() {
        let store = RecordingCacheStore::new();
        let key = TierKey::graph(&example_repo(), true);
        store.set(&key, "g").await.unwrap();
        store.get(&key).await.unwrap();
        store.delete(&key).await.unwrap();

        assert_eq!(
            store.ops(),
            vec![
                CacheOp::Set(key.clone()),
                CacheOp::Get(key.clone()),
                CacheOp::Delete(key)
            ]
        );
    }
}
