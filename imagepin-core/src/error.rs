//! Error types for imagepin-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a builder or publisher implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can arise while resolving image references.
///
/// Scan-phase variants abort before any build starts. Orchestration surfaces
/// exactly one `Build`/`Publish`/`Task` error. `MissingDigest` and
/// `DanglingNode` indicate an engine bug, never bad input.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A strict-scheme scalar is not a well-formed URL, or its path carries
    /// an invalid percent escape.
    #[error("failed to parse {reference:?}: {reason}")]
    ReferenceParse { reference: String, reason: String },

    /// The builder rejected a canonical reference.
    #[error("found strict reference but {reference} is not a valid import path: {source}")]
    UnsupportedReference {
        reference: String,
        #[source]
        source: BoxError,
    },

    /// The reference's query string is malformed.
    #[error("failed to parse query {query:?} of {reference}: {reason}")]
    QueryParse {
        reference: String,
        query: String,
        reason: String,
    },

    /// A `definedRegistry` selector without a value.
    #[error("invalid definedRegistry part: {part}")]
    InvalidSelector { part: String },

    #[error("failed to build {reference}: {source}")]
    Build {
        reference: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to publish {reference}: {source}")]
    Publish {
        reference: String,
        #[source]
        source: BoxError,
    },

    /// A resolution task panicked or was aborted before reporting.
    #[error("resolution task failed: {0}")]
    Task(String),

    /// The caller cancelled before resolution started.
    #[error("resolution cancelled")]
    Cancelled,

    #[error("resolved reference to {reference:?} not found")]
    MissingDigest { reference: String },

    #[error("occurrence of {reference} at {location} is no longer a string scalar")]
    DanglingNode { reference: String, location: String },
}

/// All errors that can arise from loading or saving `.imagepin.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config not found at {path}; run `imagepin init` to create one")]
    NotFound { path: PathBuf },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
