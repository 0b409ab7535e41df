//! Repograph Pipeline - Graph Generation
//!
//! Turns a repository identity into a graph description and a rendered
//! image. The [`Orchestrator`] checks each cache tier before delegating to
//! the next stage and populates tiers in the background on success.
//!
//! External tools (git, goda, dot) are invoked through the
//! [`CommandRunner`](repograph_core::CommandRunner) port.

pub mod command;
pub mod extractor;
pub mod local;
pub mod materializer;
pub mod orchestrator;
pub mod renderer;

pub use command::TokioCommandRunner;
pub use extractor::GodaExtractor;
pub use local::LocalGraphSource;
pub use materializer::GitMaterializer;
pub use orchestrator::{Artifact, ArtifactOrigin, Orchestrator};
pub use renderer::{DotRenderer, RENDER_OPTIONS};
