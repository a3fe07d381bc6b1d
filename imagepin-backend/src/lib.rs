//! # imagepin-backend
//!
//! Concrete [`Builder`]s and [`Publisher`]s for the resolution engine:
//!
//! - [`pinned`]: answers from the `pins` table, builds nothing
//! - [`command`]: runs external build/publish tools
//! - [`local`]: content-addresses file artifacts without uploading
//!
//! [`AnyBuilder`] and [`AnyPublisher`] select one of them from a
//! [`ResolverConfig`].

pub mod command;
mod error;
pub mod local;
pub mod pinned;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use imagepin_core::config::{BuilderConfig, PublisherConfig};
use imagepin_core::{
    Artifact, BoxError, Builder, CanonicalReference, Publisher, ResolvedDigest, ResolverConfig,
};

pub use command::{CommandBuilder, CommandPublisher};
pub use error::BackendError;
pub use local::LocalPublisher;
pub use pinned::PinnedImages;

/// Builder selected by `builder.kind`.
#[derive(Debug, Clone)]
pub enum AnyBuilder {
    Pinned(PinnedImages),
    Command(CommandBuilder),
}

impl AnyBuilder {
    pub fn from_config(config: &ResolverConfig) -> Self {
        match &config.builder {
            BuilderConfig::Pinned => Self::Pinned(PinnedImages::new(config.pins.clone())),
            BuilderConfig::Command(cmd) => Self::Command(CommandBuilder::new(cmd)),
        }
    }
}

#[async_trait]
impl Builder for AnyBuilder {
    type Artifact = Artifact;

    fn is_supported_reference(&self, reference: &CanonicalReference) -> Result<(), BoxError> {
        match self {
            AnyBuilder::Pinned(b) => b.is_supported_reference(reference),
            AnyBuilder::Command(b) => b.is_supported_reference(reference),
        }
    }

    async fn build(
        &self,
        cancel: &CancellationToken,
        reference: &CanonicalReference,
    ) -> Result<Artifact, BoxError> {
        match self {
            AnyBuilder::Pinned(b) => b.build(cancel, reference).await,
            AnyBuilder::Command(b) => b.build(cancel, reference).await,
        }
    }
}

/// Publisher selected by `publisher.kind`.
#[derive(Debug, Clone)]
pub enum AnyPublisher {
    Pinned(PinnedImages),
    Command(CommandPublisher),
    Local(LocalPublisher),
}

impl AnyPublisher {
    pub fn from_config(config: &ResolverConfig) -> Self {
        match &config.publisher {
            PublisherConfig::Pinned => Self::Pinned(PinnedImages::new(config.pins.clone())),
            PublisherConfig::Command(cmd) => Self::Command(CommandPublisher::new(cmd)),
            PublisherConfig::Local { repository } => Self::Local(LocalPublisher::new(repository)),
        }
    }
}

#[async_trait]
impl Publisher<Artifact> for AnyPublisher {
    async fn publish(
        &self,
        cancel: &CancellationToken,
        artifact: Artifact,
        reference: &CanonicalReference,
    ) -> Result<ResolvedDigest, BoxError> {
        match self {
            AnyPublisher::Pinned(p) => p.publish(cancel, artifact, reference).await,
            AnyPublisher::Command(p) => p.publish(cancel, artifact, reference).await,
            AnyPublisher::Local(p) => p.publish(cancel, artifact, reference).await,
        }
    }
}
