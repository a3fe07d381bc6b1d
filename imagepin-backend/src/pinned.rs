//! Builder and publisher backed by the `pins` table of `.imagepin.yaml`.
//!
//! Nothing is built: a reference is supported iff it is pinned, and
//! publishing returns the pinned image reference unchanged.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use imagepin_core::{Artifact, BoxError, Builder, CanonicalReference, Publisher, ResolvedDigest};

use crate::error::BackendError;

#[derive(Debug, Clone, Default)]
pub struct PinnedImages {
    pins: IndexMap<String, String>,
}

impl PinnedImages {
    pub fn new(pins: IndexMap<String, String>) -> Self {
        Self { pins }
    }

    fn lookup(&self, reference: &CanonicalReference) -> Result<&str, BackendError> {
        self.pins
            .get(reference.as_str())
            .map(String::as_str)
            .ok_or_else(|| BackendError::NotPinned {
                reference: reference.to_string(),
            })
    }
}

#[async_trait]
impl Builder for PinnedImages {
    type Artifact = Artifact;

    fn is_supported_reference(&self, reference: &CanonicalReference) -> Result<(), BoxError> {
        self.lookup(reference)?;
        Ok(())
    }

    async fn build(
        &self,
        _cancel: &CancellationToken,
        reference: &CanonicalReference,
    ) -> Result<Artifact, BoxError> {
        Ok(Artifact::Image(self.lookup(reference)?.to_owned()))
    }
}

#[async_trait]
impl Publisher<Artifact> for PinnedImages {
    async fn publish(
        &self,
        _cancel: &CancellationToken,
        artifact: Artifact,
        _reference: &CanonicalReference,
    ) -> Result<ResolvedDigest, BoxError> {
        match artifact {
            Artifact::Image(image) => Ok(ResolvedDigest::from(image)),
            Artifact::Path(path) => Err(BackendError::UnsupportedArtifact {
                publisher: "pinned",
                artifact: path.display().to_string(),
            }
            .into()),
        }
    }
}
