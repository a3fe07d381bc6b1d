//! Domain types shared by the scanner, the orchestrator and the backends.
//!
//! References that flow through the engine are newtypes over `String` so a
//! canonical reference can never be confused with a resolved image reference.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use crate::error::ResolveError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// `scheme://host/path` form of a build reference, query and fragment dropped.
///
/// This is the dedup key: every occurrence that canonicalizes to the same
/// value is built and published once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalReference(pub String);

impl CanonicalReference {
    /// Canonical form of a raw reference that already parsed as a URL.
    ///
    /// Drops query, fragment and userinfo. Host, port and path are kept as
    /// written: dot segments and escapes are not normalized, since they name
    /// the package to build.
    pub fn from_raw(raw: &str) -> Self {
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let stripped = &raw[..end];
        let Some((scheme, rest)) = stripped.split_once("://") else {
            return Self(stripped.to_owned());
        };
        let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
        let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
        Self(format!("{}://{host}{path}", scheme.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The reference with its `scheme://` prefix removed.
    pub fn import_path(&self) -> &str {
        self.0
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for CanonicalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CanonicalReference {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CanonicalReference {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Image reference returned by a publisher, e.g. `gcr.io/proj/app@sha256:…`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedDigest(pub String);

impl ResolvedDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResolvedDigest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResolvedDigest {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Query key that carries the selector of an occurrence.
pub const SELECTOR_KEY: &str = "part";

const DEFINED_REGISTRY: &str = "definedRegistry";

/// How the resolved digest is rendered into one occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selector {
    /// The full resolved reference.
    #[default]
    All,
    /// Everything before the final `/`-segment of the repository.
    Registry,
    /// Repository without tag or digest.
    Repository,
    /// Final `/`-segment of the repository.
    Name,
    /// Tag, or `latest@<digest>` for digest references.
    Tag,
    /// Like [`Selector::Tag`] but keeping the leading `:` or `@`.
    TagWithSeparator,
    /// Literal override; the resolved digest is ignored.
    DefinedRegistry(String),
    /// Unrecognized selector text. Rendered like [`Selector::All`].
    Raw,
}

impl Selector {
    /// Parse the value of a `part=` query parameter.
    ///
    /// `definedRegistry` must be followed by `=value`; any other unknown text
    /// falls back to [`Selector::Raw`].
    pub fn from_part(part: &str) -> Result<Self, ResolveError> {
        let selector = match part {
            "all" => Self::All,
            "registry" => Self::Registry,
            "repository" => Self::Repository,
            "name" => Self::Name,
            "tag" => Self::Tag,
            "tagWithSeparator" => Self::TagWithSeparator,
            other => match other.strip_prefix(DEFINED_REGISTRY) {
                Some("") => {
                    return Err(ResolveError::InvalidSelector {
                        part: other.to_owned(),
                    })
                }
                Some(rest) => match rest.split_once('=') {
                    Some(("", value)) => Self::DefinedRegistry(value.to_owned()),
                    _ => Self::Raw,
                },
                None => Self::Raw,
            },
        };
        Ok(selector)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "all"),
            Selector::Registry => write!(f, "registry"),
            Selector::Repository => write!(f, "repository"),
            Selector::Name => write!(f, "name"),
            Selector::Tag => write!(f, "tag"),
            Selector::TagWithSeparator => write!(f, "tagWithSeparator"),
            Selector::DefinedRegistry(value) => write!(f, "{DEFINED_REGISTRY}={value}"),
            Selector::Raw => write!(f, "raw"),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Output of a build, handed unchanged to the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// A file on disk, e.g. an image tarball or an OCI layout archive.
    Path(PathBuf),
    /// An image that is already addressable by reference.
    Image(String),
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Path(path) => path.display().fmt(f),
            Artifact::Image(image) => image.fmt(f),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(raw: &str) -> CanonicalReference {
        CanonicalReference::from_raw(raw)
    }

    #[test]
    fn canonical_drops_query_and_fragment() {
        assert_eq!(
            canonical("ko://github.com/acme/app/cmd/server?part=tag#frag").as_str(),
            "ko://github.com/acme/app/cmd/server"
        );
    }

    #[test]
    fn canonical_keeps_port() {
        assert_eq!(
            canonical("ko://git.internal:8443/acme/app").as_str(),
            "ko://git.internal:8443/acme/app"
        );
    }

    #[test]
    fn canonical_keeps_path_as_written() {
        assert_eq!(
            canonical("ko://github.com/acme/./app/../x?part=name").as_str(),
            "ko://github.com/acme/./app/../x"
        );
    }

    #[test]
    fn canonical_drops_userinfo() {
        assert_eq!(
            canonical("ko://bot:secret@github.com/acme/app#x").as_str(),
            "ko://github.com/acme/app"
        );
    }

    #[test]
    fn import_path_strips_scheme() {
        let r = CanonicalReference::from("ko://github.com/acme/app");
        assert_eq!(r.import_path(), "github.com/acme/app");
    }

    #[test]
    fn selector_display_matches_query_text() {
        assert_eq!(Selector::TagWithSeparator.to_string(), "tagWithSeparator");
        assert_eq!(
            Selector::DefinedRegistry("myregistry.io".into()).to_string(),
            "definedRegistry=myregistry.io"
        );
    }

    #[test]
    fn artifact_display() {
        assert_eq!(Artifact::Image("ko.local/app".into()).to_string(), "ko.local/app");
        assert_eq!(
            Artifact::Path(PathBuf::from("/tmp/app.tar")).to_string(),
            "/tmp/app.tar"
        );
    }
}
