//! Error types for imagepin-resolve.

use std::path::PathBuf;

use thiserror::Error;

use imagepin_core::ResolveError;

/// Errors reading, parsing or writing manifest files.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the source it came from.
    #[error("failed to parse manifest {source_name}: {source}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("cannot rewrite stdin in place")]
    StdinInPlace,
}

/// Errors from a full load → resolve → render run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ManifestError {
    ManifestError::Io {
        path: path.into(),
        source,
    }
}
