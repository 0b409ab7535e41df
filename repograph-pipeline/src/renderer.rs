//! Graphviz-backed layout renderer.

use std::sync::Arc;

use async_trait::async_trait;
use repograph_core::{CommandInvocation, CommandRunner, LayoutRenderer, RepographError, RepographResult};

/// Fixed render options. Every image entry is reproducible from its graph
/// entry with exactly these arguments.
pub const RENDER_OPTIONS: [&str; 4] = [
    "-Tsvg",
    "-Gfontname=Roboto,Arial,sans-serif",
    "-Nfontname=Roboto,Arial,sans-serif",
    "-Efontname=Roboto,Arial,sans-serif",
];

/// Pipes the graph description into `dot` and returns the SVG.
pub struct DotRenderer {
    runner: Arc<dyn CommandRunner>,
    dot_bin: String,
}

impl DotRenderer {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            dot_bin: "dot".to_string(),
        }
    }

    pub fn with_dot_bin(mut self, dot_bin: impl Into<String>) -> Self {
        self.dot_bin = dot_bin.into();
        self
    }
}

#[async_trait]
impl LayoutRenderer for DotRenderer {
    async fn render(&self, graph: &str) -> RepographResult<String> {
        let cmd = CommandInvocation::new(&self.dot_bin)
            .args(RENDER_OPTIONS)
            .stdin(graph);

        let output = self.runner.run(cmd).await.map_err(RepographError::render)?;
        if output.stdout.trim().is_empty() {
            return Err(RepographError::render("dot produced no output"));
        }
        Ok(output.stdout)
    }
}
