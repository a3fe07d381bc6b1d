//! Shared load → resolve → emit entrypoint used by the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use imagepin_core::{Builder, Publisher};

use crate::manifest::{ManifestSet, ManifestSource};
use crate::scanner::{self, OccurrenceMap};
use crate::{resolve_image_references, PipelineError, Resolution};

/// Where resolved manifests go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Render all sources into one stream.
    Stdout,
    /// Rewrite each file source atomically.
    InPlace,
}

/// What a pipeline run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emitted {
    Rendered(String),
    Written(Vec<PathBuf>),
}

#[derive(Debug)]
pub struct PipelineResult {
    pub resolution: Resolution,
    pub emitted: Emitted,
}

/// Load `sources`, resolve them in one engine call, then emit.
///
/// In-place runs over stdin are rejected before any build starts.
pub async fn run<B, P>(
    cancel: &CancellationToken,
    sources: &[ManifestSource],
    builder: Arc<B>,
    publisher: Arc<P>,
    output: Output,
) -> Result<PipelineResult, PipelineError>
where
    B: Builder + 'static,
    P: Publisher<B::Artifact> + 'static,
{
    let mut manifests = ManifestSet::load(sources)?;
    if output == Output::InPlace {
        manifests.ensure_writable()?;
    }

    let resolution =
        resolve_image_references(cancel, manifests.documents_mut(), builder, publisher).await?;

    let emitted = match output {
        Output::Stdout => Emitted::Rendered(manifests.render_all()?),
        Output::InPlace => Emitted::Written(manifests.write_in_place()?),
    };
    Ok(PipelineResult {
        resolution,
        emitted,
    })
}

/// Load `sources` and report their references without building anything.
pub fn scan_only<B: Builder + ?Sized>(
    sources: &[ManifestSource],
    builder: &B,
) -> Result<OccurrenceMap, PipelineError> {
    let manifests = ManifestSet::load(sources)?;
    Ok(scanner::scan(manifests.documents(), builder)?)
}
