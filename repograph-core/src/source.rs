//! Collaborator traits for the graph pipeline
//!
//! Source materialization, graph extraction and layout rendering are
//! implemented outside the orchestrator. These traits are the seams.

use crate::error::RepographResult;
use crate::identity::RepoId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A source tree available on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedSource {
    pub path: PathBuf,
    /// Revision the tree was checked out at, when known.
    pub version: Option<String>,
}

/// Repository reference -> local source tree.
#[async_trait]
pub trait SourceMaterializer: Send + Sync {
    async fn materialize(&self, repo: &RepoId) -> RepographResult<MaterializedSource>;
}

/// Local source tree + cluster flag -> graph description text.
#[async_trait]
pub trait GraphExtractor: Send + Sync {
    async fn extract(&self, repo: &RepoId, source: &Path, cluster: bool) -> RepographResult<String>;
}

/// Graph description text -> rendered image text.
#[async_trait]
pub trait LayoutRenderer: Send + Sync {
    async fn render(&self, graph: &str) -> RepographResult<String>;
}

/// Produces graph description text for a repository, uncached.
///
/// Either in-process (materialize + extract) or through the isolated
/// graph worker service.
#[async_trait]
pub trait GraphSource: Send + Sync {
    async fn generate_graph(&self, repo: &RepoId, cluster: bool) -> RepographResult<String>;
}
