//! Builder and publisher seams consumed by the resolution engine.
//!
//! Both traits receive the run's [`CancellationToken`]. Implementations are
//! expected to abort promptly once it fires; the engine cancels it as soon as
//! any sibling build or publish fails.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::types::{CanonicalReference, ResolvedDigest};

/// Prefix that marks a scalar as a buildable reference.
pub const STRICT_SCHEME: &str = "ko://";

/// Turns a canonical reference into a publishable artifact.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Whatever the matching [`Publisher`] consumes.
    type Artifact: Send + 'static;

    /// Scalars whose trimmed value starts with this prefix are candidates.
    fn strict_scheme(&self) -> &str {
        STRICT_SCHEME
    }

    /// Cheap validation, no I/O. Called once per raw occurrence.
    fn is_supported_reference(&self, reference: &CanonicalReference) -> Result<(), BoxError>;

    async fn build(
        &self,
        cancel: &CancellationToken,
        reference: &CanonicalReference,
    ) -> Result<Self::Artifact, BoxError>;
}

/// Makes a built artifact addressable and reports its image reference.
#[async_trait]
pub trait Publisher<A>: Send + Sync
where
    A: Send + 'static,
{
    async fn publish(
        &self,
        cancel: &CancellationToken,
        artifact: A,
        reference: &CanonicalReference,
    ) -> Result<ResolvedDigest, BoxError>;
}
