//! # imagepin-resolve
//!
//! Turns `ko://` references inside YAML manifests into published image
//! references, rewriting the manifests in place.
//!
//! Call [`resolve_image_references`] on already-parsed documents, or
//! [`pipeline::run`] to load, resolve and emit manifest files.
//!
//! The run has three phases:
//! 1. [`scanner::scan`]: collect occurrences, grouped by canonical reference
//! 2. [`orchestrator::build_and_publish`]: one concurrent task per reference
//! 3. [`rewriter::rewrite`]: render each occurrence's selector into its node

pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
mod query;
pub mod rewriter;
pub mod scanner;

use std::sync::Arc;

use serde_yaml::Value;
use tokio_util::sync::CancellationToken;

use imagepin_core::{Builder, Publisher, ResolveError};

pub use error::{ManifestError, PipelineError};
pub use manifest::{ManifestSet, ManifestSource};
pub use scanner::{NodeHandle, Occurrence, OccurrenceMap};

/// Counts reported by a successful resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Distinct canonical references built and published.
    pub references: usize,
    /// Scalars rewritten.
    pub occurrences: usize,
}

/// Resolve every strict-scheme reference in `documents` and rewrite it.
///
/// All-or-nothing: on error no document has been modified.
pub async fn resolve_image_references<B, P>(
    cancel: &CancellationToken,
    documents: &mut [Value],
    builder: Arc<B>,
    publisher: Arc<P>,
) -> Result<Resolution, ResolveError>
where
    B: Builder + 'static,
    P: Publisher<B::Artifact> + 'static,
{
    let refs = scanner::scan(documents, builder.as_ref())?;
    if refs.is_empty() {
        tracing::debug!("no strict references found");
        return Ok(Resolution::default());
    }
    if cancel.is_cancelled() {
        return Err(ResolveError::Cancelled);
    }

    let digests =
        orchestrator::build_and_publish(cancel, refs.keys().cloned(), builder, publisher).await?;
    let occurrences = rewriter::rewrite(documents, &refs, &digests)?;

    Ok(Resolution {
        references: refs.len(),
        occurrences,
    })
}
