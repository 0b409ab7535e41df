//! Repository identities and render targets

use crate::error::RepographError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters allowed inside a canonical repository identity.
///
/// `+` is deliberately absent: it separates the identity from the cluster
/// flag in two-part cache keys.
static REPO_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._~:@/-]+$").expect("Invalid repository regex"));

/// Separator between identity and cluster flag in two-part cache keys.
pub const KEY_SEPARATOR: char = '+';

// ============================================================================
// REPOSITORY IDENTITY
// ============================================================================

/// Canonical name of a source repository, e.g. `github.com/owner/project`.
///
/// Primary key component of every cache tier. Construct through
/// [`RepoId::parse`]; the inner string is always canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId(String);

impl RepoId {
    /// Canonicalize and validate a user supplied repository reference.
    ///
    /// Strips a leading `scheme://` and trailing slashes.
    pub fn parse(input: &str) -> Result<Self, RepographError> {
        let invalid = |reason: &str| RepographError::InvalidRepo {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = match input.find("://") {
            Some(idx) => &input[idx + 3..],
            None => input,
        };
        let trimmed = trimmed.trim_end_matches('/');

        if trimmed.is_empty() {
            return Err(invalid("repository is empty"));
        }
        if trimmed.contains(KEY_SEPARATOR) {
            return Err(invalid("repository must not contain '+'"));
        }
        if !REPO_ID_PATTERN.is_match(trimmed) {
            return Err(invalid("repository contains invalid characters"));
        }
        if trimmed.starts_with('/') {
            return Err(invalid("repository must not start with '/'"));
        }
        if trimmed.split('/').any(|segment| segment == ".." || segment == ".") {
            return Err(invalid("repository must not contain relative path segments"));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL the source tree is cloned from.
    pub fn clone_url(&self) -> String {
        format!("https://{}", self.0)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RepoId {
    type Err = RepographError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepoId {
    type Error = RepographError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.0
    }
}

impl AsRef<str> for RepoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

/// The two artifacts served per (repository, cluster) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Rendered vector image.
    Svg,
    /// Graph description text.
    Dot,
}

impl ArtifactFormat {
    pub const ALL: [ArtifactFormat; 2] = [ArtifactFormat::Svg, ArtifactFormat::Dot];

    pub fn suffix(&self) -> &'static str {
        match self {
            ArtifactFormat::Svg => ".svg",
            ArtifactFormat::Dot => ".dot",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "image/svg+xml; charset=utf-8",
            ArtifactFormat::Dot => "text/plain; charset=utf-8",
        }
    }

    /// Split a request path like `github.com/a/b.svg` into the repository
    /// part and its format. Returns `None` when no known suffix is present.
    pub fn split_path(path: &str) -> Option<(&str, ArtifactFormat)> {
        Self::ALL.iter().find_map(|format| {
            path.strip_suffix(format.suffix())
                .map(|repo| (repo, *format))
        })
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactFormat::Svg => write!(f, "svg"),
            ArtifactFormat::Dot => write!(f, "dot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_strips_scheme_and_trailing_slash() {
        let id = RepoId::parse("https://github.com/owner/project/").unwrap();
        assert_eq!(id.as_str(), "github.com/owner/project");
        assert_eq!(id.clone_url(), "https://github.com/owner/project");
    }

    #[test]
    fn test_parse_plain_identity_unchanged() {
        let id = RepoId::parse("example.org/pkg").unwrap();
        assert_eq!(id.to_string(), "example.org/pkg");
    }

    #[test]
    fn test_parse_rejects_invalid_input() {
        for input in [
            "",
            "/",
            "https://",
            "example.org/a+b",
            "example.org/a b",
            "example.org/../etc",
            "example.org/./x",
            "/abs/path",
            "example.org/\u{7}bell",
        ] {
            let err = RepoId::parse(input).unwrap_err();
            assert!(
                matches!(err, RepographError::InvalidRepo { .. }),
                "expected InvalidRepo for {input:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_serde_validates() {
        let id: RepoId = serde_json::from_str("\"http://example.org/pkg\"").unwrap();
        assert_eq!(id.as_str(), "example.org/pkg");
        assert!(serde_json::from_str::<RepoId>("\"a+b\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"example.org/pkg\"");
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            ArtifactFormat::split_path("example.org/pkg.svg"),
            Some(("example.org/pkg", ArtifactFormat::Svg))
        );
        assert_eq!(
            ArtifactFormat::split_path("example.org/pkg.dot"),
            Some(("example.org/pkg", ArtifactFormat::Dot))
        );
        assert_eq!(ArtifactFormat::split_path("example.org/pkg.png"), None);
        assert_eq!(ArtifactFormat::split_path("example.org/pkg"), None);
    }

    proptest! {
        #[test]
        fn prop_canonical_form_is_stable(
            host in "[a-z]{1,10}\\.[a-z]{2,3}",
            path in proptest::collection::vec("[A-Za-z0-9_-]{1,8}", 0..4),
        ) {
            let raw = std::iter::once(host).chain(path).collect::<Vec<_>>().join("/");
            let first = RepoId::parse(&raw).unwrap();
            let second = RepoId::parse(first.as_str()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_canonical_never_contains_separator(input in "\\PC{0,40}") {
            if let Ok(id) = RepoId::parse(&input) {
                prop_assert!(!id.as_str().contains(KEY_SEPARATOR));
                prop_assert!(!id.as_str().ends_with('/'));
            }
        }
    }
}
