//! Digest rewriter: renders each occurrence's selector against its resolved
//! image reference and writes the result into the document tree.
//!
//! # Image reference anatomy
//!
//! ```text
//! localhost:5000/team/app:v1@sha256:abcd
//! └──────────── repository ─┘└tag┘ └ digest ┘
//! └ registry ──────┘    └name┘
//! ```
//!
//! The digest is everything after the first `@`. The tag is searched for only
//! in the final `/`-segment, so a registry port never reads as a tag.

use serde_yaml::Value;

use imagepin_core::{ResolveError, ResolvedDigest, Selector};

use crate::orchestrator::DigestMap;
use crate::scanner::{NodeHandle, OccurrenceMap};

/// Tag reported for references that carry neither tag nor digest.
///
/// Deliberately `latest` rather than echoing the whole path back as the tag.
const DEFAULT_TAG: &str = "latest";

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A resolved image reference split into its parts. Borrows the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageParts<'a> {
    /// `host/path`, without tag or digest.
    pub repository: &'a str,
    pub tag: Option<&'a str>,
    /// `algo:hex`, without the `@`.
    pub digest: Option<&'a str>,
}

impl<'a> ImageParts<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let (named, digest) = match reference.split_once('@') {
            Some((named, digest)) => (named, Some(digest)),
            None => (reference, None),
        };
        let last_segment = named.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match named[last_segment..].rfind(':') {
            Some(i) => {
                let colon = last_segment + i;
                (&named[..colon], Some(&named[colon + 1..]))
            }
            None => (named, None),
        };
        Self {
            repository,
            tag,
            digest,
        }
    }

    /// Repository with its final `/`-segment removed; empty if there is none.
    pub fn registry(&self) -> &'a str {
        self.repository
            .rfind('/')
            .map_or("", |i| &self.repository[..i])
    }

    /// Final `/`-segment of the repository.
    pub fn name(&self) -> &'a str {
        self.repository
            .rfind('/')
            .map_or(self.repository, |i| &self.repository[i + 1..])
    }

    /// Tag text; a content digest takes precedence over any tag.
    pub fn tag_text(&self) -> String {
        match (self.digest, self.tag) {
            (Some(digest), _) => format!("{DEFAULT_TAG}@{digest}"),
            (None, Some(tag)) => tag.to_owned(),
            (None, None) => DEFAULT_TAG.to_owned(),
        }
    }

    /// Like [`ImageParts::tag_text`] but keeping the separator.
    pub fn tag_with_separator(&self) -> String {
        match (self.digest, self.tag) {
            (Some(digest), _) => format!("@{digest}"),
            (None, Some(tag)) => format!(":{tag}"),
            (None, None) => format!(":{DEFAULT_TAG}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Replacement text for one occurrence.
pub fn render(selector: &Selector, digest: &ResolvedDigest) -> String {
    let parts = ImageParts::parse(digest.as_str());
    match selector {
        Selector::All | Selector::Raw => digest.to_string(),
        Selector::Registry => parts.registry().to_owned(),
        Selector::Repository => parts.repository.to_owned(),
        Selector::Name => parts.name().to_owned(),
        Selector::Tag => parts.tag_text(),
        Selector::TagWithSeparator => parts.tag_with_separator(),
        Selector::DefinedRegistry(value) => {
            tracing::warn!(
                value = %value,
                resolved = %digest,
                "definedRegistry overrides resolved reference"
            );
            value.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Rewrite
// ---------------------------------------------------------------------------

/// Write every occurrence's replacement into `documents`.
///
/// All replacements are computed and all handles checked before the first
/// write, so an error leaves the documents untouched.
pub fn rewrite(
    documents: &mut [Value],
    refs: &OccurrenceMap,
    digests: &DigestMap,
) -> Result<usize, ResolveError> {
    let mut planned: Vec<(&NodeHandle, String)> = Vec::new();

    for (reference, occurrences) in refs {
        let digest = digests
            .get(reference)
            .ok_or_else(|| ResolveError::MissingDigest {
                reference: reference.to_string(),
            })?;

        for occurrence in occurrences {
            let is_string = occurrence
                .node
                .resolve(documents)
                .is_some_and(Value::is_string);
            if !is_string {
                return Err(ResolveError::DanglingNode {
                    reference: reference.to_string(),
                    location: occurrence.node.to_string(),
                });
            }
            planned.push((&occurrence.node, render(&occurrence.selector, digest)));
        }
    }

    let written = planned.len();
    for (handle, text) in planned {
        if let Some(node) = handle.resolve_mut(documents) {
            tracing::debug!(location = %handle, value = %text, "rewriting");
            *node = Value::String(text);
        }
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use imagepin_core::CanonicalReference;

    use super::*;
    use crate::scanner::{Occurrence, PathSegment};

    const APP: &str = "ko://github.com/acme/app";
    const WORKER: &str = "ko://github.com/acme/worker";

    fn occurrence(document: usize, key: &str) -> Occurrence {
        Occurrence {
            selector: Selector::All,
            node: NodeHandle {
                document,
                path: vec![PathSegment::Key(Value::String(key.into()))],
            },
        }
    }

    fn two_refs() -> OccurrenceMap {
        let mut refs = IndexMap::new();
        refs.insert(CanonicalReference::from(APP), vec![occurrence(0, "image")]);
        refs.insert(CanonicalReference::from(WORKER), vec![occurrence(1, "image")]);
        refs
    }

    fn two_docs() -> Vec<Value> {
        crate::manifest::parse_documents(&format!("image: {APP}\n---\nimage: {WORKER}\n"))
            .expect("yaml")
    }

    #[test]
    fn missing_digest_writes_nothing() {
        let mut documents = two_docs();
        let before = documents.clone();
        let mut digests = DigestMap::new();
        digests.insert(APP.into(), ResolvedDigest::from("gcr.io/acme/app@sha256:abcd"));

        let err = rewrite(&mut documents, &two_refs(), &digests).unwrap_err();

        assert!(
            matches!(&err, ResolveError::MissingDigest { reference } if reference == WORKER),
            "got: {err}"
        );
        assert_eq!(documents, before);
    }

    #[test]
    fn replaced_node_is_dangling_and_writes_nothing() {
        let mut documents = two_docs();
        documents[1]["image"] =
            crate::manifest::parse_documents("name: worker\n").expect("yaml")[0].clone();
        let before = documents.clone();
        let mut digests = DigestMap::new();
        digests.insert(APP.into(), ResolvedDigest::from("gcr.io/acme/app@sha256:abcd"));
        digests.insert(WORKER.into(), ResolvedDigest::from("gcr.io/acme/worker@sha256:ef01"));

        let err = rewrite(&mut documents, &two_refs(), &digests).unwrap_err();

        match &err {
            ResolveError::DanglingNode { reference, location } => {
                assert_eq!(reference, WORKER);
                assert_eq!(location, "doc[1].image");
            }
            other => panic!("expected DanglingNode, got {other}"),
        }
        assert_eq!(documents, before);
    }

    #[test]
    fn parse_digest_form() {
        let p = ImageParts::parse("registry.example/repo@sha256:abcd");
        assert_eq!(p.repository, "registry.example/repo");
        assert_eq!(p.tag, None);
        assert_eq!(p.digest, Some("sha256:abcd"));
    }

    #[test]
    fn parse_port_is_not_a_tag() {
        let p = ImageParts::parse("localhost:5000/team/app");
        assert_eq!(p.repository, "localhost:5000/team/app");
        assert_eq!(p.tag, None);
        assert_eq!(p.registry(), "localhost:5000/team");
    }

    #[test]
    fn parse_tag_and_digest() {
        let p = ImageParts::parse("localhost:5000/app:v1@sha256:abcd");
        assert_eq!(p.repository, "localhost:5000/app");
        assert_eq!(p.tag, Some("v1"));
        assert_eq!(p.digest, Some("sha256:abcd"));
        assert_eq!(p.tag_text(), "latest@sha256:abcd");
    }

    #[test]
    fn bare_name_has_no_registry() {
        let p = ImageParts::parse("app:v2");
        assert_eq!(p.registry(), "");
        assert_eq!(p.name(), "app");
        assert_eq!(p.tag_text(), "v2");
    }

    #[test]
    fn untagged_reference_reports_latest() {
        let p = ImageParts::parse("gcr.io/acme/app");
        assert_eq!(p.tag_text(), "latest");
        assert_eq!(p.tag_with_separator(), ":latest");
    }
}
