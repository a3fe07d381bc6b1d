//! Reference scanner: finds strict-scheme scalars and groups them by
//! canonical reference.
//!
//! The scanner never copies nodes. Each occurrence records a [`NodeHandle`]
//! (document index plus path) that the rewriter resolves in a second pass.

use std::fmt;

use indexmap::IndexMap;
use serde_yaml::Value;
use url::Url;

use imagepin_core::{Builder, CanonicalReference, ResolveError, Selector};

use crate::query::{parse_query, validate_escapes};

// ---------------------------------------------------------------------------
// Node handles
// ---------------------------------------------------------------------------

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Sequence item.
    Index(usize),
    /// Mapping value under this key.
    Key(Value),
    /// Content of a `!tagged` node.
    Tagged,
}

/// Location of a scalar inside a document set.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHandle {
    pub document: usize,
    pub path: Vec<PathSegment>,
}

impl NodeHandle {
    pub fn resolve<'a>(&self, documents: &'a [Value]) -> Option<&'a Value> {
        let mut node = documents.get(self.document)?;
        for segment in &self.path {
            node = match (segment, node) {
                (PathSegment::Index(i), Value::Sequence(seq)) => seq.get(*i)?,
                (PathSegment::Key(key), Value::Mapping(map)) => map.get(key)?,
                (PathSegment::Tagged, Value::Tagged(tagged)) => &tagged.value,
                _ => return None,
            };
        }
        Some(node)
    }

    pub fn resolve_mut<'a>(&self, documents: &'a mut [Value]) -> Option<&'a mut Value> {
        let mut node = documents.get_mut(self.document)?;
        for segment in &self.path {
            node = match (segment, node) {
                (PathSegment::Index(i), Value::Sequence(seq)) => seq.get_mut(*i)?,
                (PathSegment::Key(key), Value::Mapping(map)) => map.get_mut(key)?,
                (PathSegment::Tagged, Value::Tagged(tagged)) => &mut tagged.value,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc[{}]", self.document)?;
        for segment in &self.path {
            match segment {
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Key(Value::String(key)) => write!(f, ".{key}")?,
                PathSegment::Key(key) => write!(f, ".{key:?}")?,
                PathSegment::Tagged => write!(f, ".<tagged>")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Occurrences
// ---------------------------------------------------------------------------

/// A pending rewrite of one scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub selector: Selector,
    pub node: NodeHandle,
}

/// Canonical reference → occurrences, both in first-seen order.
pub type OccurrenceMap = IndexMap<CanonicalReference, Vec<Occurrence>>;

/// Walk `documents` depth-first and collect every strict-scheme reference.
///
/// Fails on the first malformed or unsupported reference; no build has been
/// started at that point.
pub fn scan<B: Builder + ?Sized>(
    documents: &[Value],
    builder: &B,
) -> Result<OccurrenceMap, ResolveError> {
    let scheme = builder.strict_scheme();
    let mut candidates = Vec::new();
    for (index, document) in documents.iter().enumerate() {
        let mut path = Vec::new();
        collect_candidates(document, scheme, index, &mut path, &mut candidates);
    }

    let mut refs = OccurrenceMap::new();
    for (raw, node) in candidates {
        let (reference, selector) = parse_reference(raw, builder)?;
        tracing::debug!(reference = %reference, %selector, location = %node, "found reference");
        refs.entry(reference)
            .or_default()
            .push(Occurrence { selector, node });
    }
    Ok(refs)
}

fn collect_candidates<'a>(
    node: &'a Value,
    scheme: &str,
    document: usize,
    path: &mut Vec<PathSegment>,
    out: &mut Vec<(&'a str, NodeHandle)>,
) {
    match node {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with(scheme) {
                out.push((
                    trimmed,
                    NodeHandle {
                        document,
                        path: path.clone(),
                    },
                ));
            }
        }
        Value::Sequence(seq) => {
            for (i, item) in seq.iter().enumerate() {
                path.push(PathSegment::Index(i));
                collect_candidates(item, scheme, document, path, out);
                path.pop();
            }
        }
        Value::Mapping(map) => {
            for (key, value) in map {
                path.push(PathSegment::Key(key.clone()));
                collect_candidates(value, scheme, document, path, out);
                path.pop();
            }
        }
        Value::Tagged(tagged) => {
            path.push(PathSegment::Tagged);
            collect_candidates(&tagged.value, scheme, document, path, out);
            path.pop();
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Canonicalize one raw occurrence and derive its selector.
pub fn parse_reference<B: Builder + ?Sized>(
    raw: &str,
    builder: &B,
) -> Result<(CanonicalReference, Selector), ResolveError> {
    let invalid = |reason: String| ResolveError::ReferenceParse {
        reference: raw.to_owned(),
        reason,
    };
    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    let reference = CanonicalReference::from_raw(raw);
    validate_escapes(reference.as_str()).map_err(invalid)?;

    builder
        .is_supported_reference(&reference)
        .map_err(|source| ResolveError::UnsupportedReference {
            reference: reference.to_string(),
            source,
        })?;

    let raw_query = parsed.query().unwrap_or_default();
    let query = parse_query(raw_query).map_err(|reason| ResolveError::QueryParse {
        reference: reference.to_string(),
        query: raw_query.to_owned(),
        reason,
    })?;

    let selector = match query
        .get(imagepin_core::types::SELECTOR_KEY)
        .and_then(|values| values.first())
    {
        Some(part) => Selector::from_part(part)?,
        None => Selector::All,
    };
    Ok((reference, selector))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
