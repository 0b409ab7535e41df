//! Tier-scoped cache keys.
//!
//! A `TierKey` can only be built through a per-tier constructor, so a graph
//! or image key can never be created without its cluster flag and a
//! directory key can never carry one.

use std::fmt;

use repograph_core::identity::KEY_SEPARATOR;
use repograph_core::RepoId;

/// Separator byte between the tier discriminant and the field.
const SEPARATOR: u8 = 0xFF;

/// One logical cache collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    /// Repository -> local source tree location.
    Directory,
    /// Repository -> checked out revision.
    Version,
    /// (repository, cluster) -> graph description.
    Graph,
    /// (repository, cluster) -> rendered image.
    Image,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Directory, Tier::Version, Tier::Graph, Tier::Image];

    /// Namespace name, used for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Directory => "repodir",
            Tier::Version => "version",
            Tier::Graph => "dot",
            Tier::Image => "svg",
        }
    }

    /// Whether keys in this tier include the cluster flag.
    pub fn is_clustered(&self) -> bool {
        matches!(self, Tier::Graph | Tier::Image)
    }

    fn to_byte(self) -> u8 {
        match self {
            Tier::Directory => 0,
            Tier::Version => 1,
            Tier::Graph => 2,
            Tier::Image => 3,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Tier::Directory),
            1 => Some(Tier::Version),
            2 => Some(Tier::Graph),
            3 => Some(Tier::Image),
            _ => None,
        }
    }

    /// Prefix shared by every encoded key of this tier.
    pub fn prefix(&self) -> [u8; 2] {
        [self.to_byte(), SEPARATOR]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cache key scoped to one tier.
///
/// # Binary Format
///
/// - Byte 0: tier discriminant
/// - Byte 1: separator (0xFF)
/// - Remaining bytes: the field, `repo` or `repo+true` / `repo+false`
///
/// The field never contains 0xFF (identities are ASCII) and identities never
/// contain `+`, so both splits are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TierKey {
    inner: TierKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TierKeyInner {
    tier: Tier,
    repo: RepoId,
    cluster: Option<bool>,
}

impl TierKey {
    fn new(tier: Tier, repo: &RepoId, cluster: Option<bool>) -> Self {
        Self {
            inner: TierKeyInner {
                tier,
                repo: repo.clone(),
                cluster,
            },
        }
    }

    pub fn directory(repo: &RepoId) -> Self {
        Self::new(Tier::Directory, repo, None)
    }

    pub fn version(repo: &RepoId) -> Self {
        Self::new(Tier::Version, repo, None)
    }

    pub fn graph(repo: &RepoId, cluster: bool) -> Self {
        Self::new(Tier::Graph, repo, Some(cluster))
    }

    pub fn image(repo: &RepoId, cluster: bool) -> Self {
        Self::new(Tier::Image, repo, Some(cluster))
    }

    /// Every key `refresh` must clear for `repo`.
    pub fn all_for(repo: &RepoId) -> Vec<TierKey> {
        vec![
            Self::graph(repo, false),
            Self::graph(repo, true),
            Self::image(repo, false),
            Self::image(repo, true),
            Self::directory(repo),
            Self::version(repo),
        ]
    }

    pub fn tier(&self) -> Tier {
        self.inner.tier
    }

    pub fn repo(&self) -> &RepoId {
        &self.inner.repo
    }

    pub fn cluster(&self) -> Option<bool> {
        self.inner.cluster
    }

    /// Field within the tier namespace: `repo` or `repo+<cluster>`.
    pub fn field(&self) -> String {
        match self.inner.cluster {
            Some(cluster) => format!("{}{}{}", self.inner.repo, KEY_SEPARATOR, cluster),
            None => self.inner.repo.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let field = self.field();
        let mut bytes = Vec::with_capacity(2 + field.len());
        bytes.extend_from_slice(&self.inner.tier.prefix());
        bytes.extend_from_slice(field.as_bytes());
        bytes
    }

    /// Decode a key from bytes.
    ///
    /// Returns `None` for an unknown tier, a missing separator, a field that
    /// is not a canonical identity, or a cluster flag that does not match
    /// the tier.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 || bytes[1] != SEPARATOR {
            return None;
        }
        let tier = Tier::from_byte(bytes[0])?;
        let field = std::str::from_utf8(&bytes[2..]).ok()?;

        let (repo, cluster) = if tier.is_clustered() {
            let (repo, flag) = field.rsplit_once(KEY_SEPARATOR)?;
            let cluster = match flag {
                "true" => true,
                "false" => false,
                _ => return None,
            };
            (repo, Some(cluster))
        } else {
            (field, None)
        };

        let parsed = RepoId::parse(repo).ok()?;
        if parsed.as_str() != repo {
            return None;
        }

        Some(Self::new(tier, &parsed, cluster))
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.inner.tier, self.field())
    }
}
