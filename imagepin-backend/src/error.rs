//! Error types for imagepin-backend.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// All errors raised by the shipped builders and publishers.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{reference} has no entry in pins")]
    NotPinned { reference: String },

    #[error("invalid import path {import_path:?}: {reason}")]
    InvalidImportPath {
        import_path: String,
        reason: &'static str,
    },

    #[error("{publisher} publisher cannot publish artifact {artifact}")]
    UnsupportedArtifact {
        publisher: &'static str,
        artifact: String,
    },

    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} printed nothing on stdout")]
    EmptyOutput { program: String },

    #[error("{program} printed an invalid image reference {output:?}")]
    InvalidOutput { program: String, output: String },

    #[error("cancelled while {operation}")]
    Cancelled { operation: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> BackendError {
    BackendError::Io {
        path: path.into(),
        source,
    }
}
