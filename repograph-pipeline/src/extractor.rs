//! goda-backed graph extractor.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use repograph_core::{
    CommandError, CommandInvocation, CommandRunner, GraphExtractor, RepoId, RepographError,
    RepographResult,
};

/// goda reports an empty package pattern on stderr with a zero exit code.
const NO_PACKAGES: &str = "matched no packages";

/// Runs `goda graph -short [-cluster] ./...:root` inside the source tree.
pub struct GodaExtractor {
    runner: Arc<dyn CommandRunner>,
    goda_bin: String,
}

impl GodaExtractor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            goda_bin: "goda".to_string(),
        }
    }

    pub fn with_goda_bin(mut self, goda_bin: impl Into<String>) -> Self {
        self.goda_bin = goda_bin.into();
        self
    }

    fn invocation(&self, source: &Path, cluster: bool) -> CommandInvocation {
        let mut cmd = CommandInvocation::new(&self.goda_bin).args(["graph", "-short"]);
        if cluster {
            cmd = cmd.arg("-cluster");
        }
        cmd.arg("./...:root").current_dir(source)
    }
}

#[async_trait]
impl GraphExtractor for GodaExtractor {
    async fn extract(&self, repo: &RepoId, source: &Path, cluster: bool) -> RepographResult<String> {
        let output = match self.runner.run(self.invocation(source, cluster)).await {
            Ok(output) => output,
            Err(CommandError::Failed { stderr, code, .. }) => {
                return Err(RepographError::extraction(
                    repo,
                    format!("goda exited with {code:?}: {}", stderr.trim()),
                ));
            }
            Err(e) => return Err(RepographError::extraction(repo, e)),
        };

        if output.stderr.contains(NO_PACKAGES) {
            return Err(RepographError::extraction(
                repo,
                format!("goda returned stderr: {}", output.stderr.trim()),
            ));
        }
        if output.stdout.trim().is_empty() {
            return Err(RepographError::extraction(repo, "goda produced no output"));
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repograph_core::CommandOutput;
    use repograph_test_utils::ScriptedCommandRunner;

    fn repo() -> RepoId {
        RepoId::parse("example.org/pkg").unwrap()
    }

    #[tokio::test]
    async fn test_arguments_follow_cluster_flag() {
        let runner = Arc::new(ScriptedCommandRunner::new().on("goda", Ok("digraph{}".into())));
        let extractor = GodaExtractor::new(runner.clone());

        extractor.extract(&repo(), Path::new("/src"), false).await.unwrap();
        extractor.extract(&repo(), Path::new("/src"), true).await.unwrap();

        let calls = runner.invocations();
        assert_eq!(calls[0].args, ["graph", "-short", "./...:root"]);
        assert_eq!(calls[1].args, ["graph", "-short", "-cluster", "./...:root"]);
        assert_eq!(calls[0].current_dir.as_deref(), Some(Path::new("/src")));
    }

    #[tokio::test]
    async fn test_no_packages_on_stderr_is_failure() {
        let runner = Arc::new(ScriptedCommandRunner::new().on(
            "goda",
            Ok(CommandOutput {
                stdout: "digraph{}".into(),
                stderr: "warning: \"./...\" matched no packages".into(),
            }),
        ));
        let err = GodaExtractor::new(runner)
            .extract(&repo(), Path::new("/src"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, RepographError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let runner = Arc::new(ScriptedCommandRunner::new().on("goda", Ok("  \n".into())));
        let err = GodaExtractor::new(runner)
            .extract(&repo(), Path::new("/src"), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no output"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_extraction_error() {
        let runner = Arc::new(ScriptedCommandRunner::new().on(
            "goda",
            Err(CommandError::Failed {
                program: "goda".into(),
                code: Some(1),
                stdout: String::new(),
                stderr: "cannot load packages".into(),
            }),
        ));
        let err = GodaExtractor::new(runner)
            .extract(&repo(), Path::new("/src"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, RepographError::Extraction { .. }));
        assert!(err.to_string().contains("cannot load packages"));
    }
}
