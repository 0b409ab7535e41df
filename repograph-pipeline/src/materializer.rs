//! Git-backed source materializer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use repograph_core::{
    CommandInvocation, CommandRunner, MaterializedSource, RepoId, RepographError,
    RepographResult, SourceMaterializer,
};
use uuid::Uuid;

/// Shallow-clones repositories into fresh directories under `work_dir`.
///
/// Every call gets its own `<work_dir>/<uuid>` directory, so concurrent
/// materializations of one repository never share a tree.
pub struct GitMaterializer {
    runner: Arc<dyn CommandRunner>,
    git_bin: String,
    work_dir: PathBuf,
}

impl GitMaterializer {
    pub fn new(runner: Arc<dyn CommandRunner>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            git_bin: "git".to_string(),
            work_dir: work_dir.into(),
        }
    }

    pub fn with_git_bin(mut self, git_bin: impl Into<String>) -> Self {
        self.git_bin = git_bin.into();
        self
    }

    async fn revision(&self, repo: &RepoId, dest: &Path) -> Option<String> {
        let rev_parse = CommandInvocation::new(&self.git_bin)
            .arg("-C")
            .arg(dest.display().to_string())
            .args(["rev-parse", "HEAD"]);

        match self.runner.run(rev_parse).await {
            Ok(output) => Some(output.stdout.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "Could not read checked out revision");
                None
            }
        }
    }
}

#[async_trait]
impl SourceMaterializer for GitMaterializer {
    async fn materialize(&self, repo: &RepoId) -> RepographResult<MaterializedSource> {
        tokio::fs::create_dir_all(&self.work_dir).await.map_err(|e| {
            RepographError::resolution(
                repo,
                format!("cannot create work dir {}: {e}", self.work_dir.display()),
            )
        })?;

        let dest = self.work_dir.join(Uuid::now_v7().to_string());
        let clone = CommandInvocation::new(&self.git_bin)
            .args(["clone", "--depth", "1", "--no-tags"])
            .arg(repo.clone_url())
            .arg(dest.display().to_string());

        if let Err(e) = self.runner.run(clone).await {
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dest).await {
                tracing::debug!(path = %dest.display(), error = %cleanup, "No partial clone to remove");
            }
            return Err(RepographError::resolution(repo, e));
        }

        let version = self.revision(repo, &dest).await;
        tracing::info!(
            repo = %repo,
            path = %dest.display(),
            version = version.as_deref().unwrap_or("unknown"),
            "Materialized source"
        );

        Ok(MaterializedSource {
            path: dest,
            version,
        })
    }
}
