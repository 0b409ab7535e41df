//! Repograph Core - Shared Types
//!
//! Repository identities, render targets, the error taxonomy and the traits
//! implemented by external collaborators. Every other crate depends on this.

pub mod command;
pub mod error;
pub mod identity;
pub mod source;

pub use command::{CommandInvocation, CommandOutput, CommandRunner};
pub use error::{CacheError, CommandError, ErrorKind, RepographError, RepographResult};
pub use identity::{ArtifactFormat, RepoId};
pub use source::{GraphExtractor, GraphSource, LayoutRenderer, MaterializedSource, SourceMaterializer};
