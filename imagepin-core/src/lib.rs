//! imagepin core library: domain types, collaborator traits, errors, config.
//!
//! - [`types`]: references, selectors, artifacts
//! - [`collaborator`]: [`Builder`] / [`Publisher`] seams
//! - [`error`]: [`ResolveError`], [`ConfigError`]
//! - [`config`]: `.imagepin.yaml` load / save

pub mod collaborator;
pub mod config;
pub mod error;
pub mod types;

pub use collaborator::{Builder, Publisher, STRICT_SCHEME};
pub use config::ResolverConfig;
pub use error::{BoxError, ConfigError, ResolveError};
pub use types::{Artifact, CanonicalReference, ResolvedDigest, Selector};
