//! Publisher that content-addresses file artifacts without uploading them.
//!
//! Produces `<repository>/<name>@sha256:<hex>` where `name` is the final
//! import-path segment. Useful for dry runs and for clusters that load images
//! from a local store.

use std::path::Path;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use imagepin_core::{Artifact, BoxError, CanonicalReference, Publisher, ResolvedDigest};

use crate::error::{io_err, BackendError};

const READ_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LocalPublisher {
    repository: String,
}

impl LocalPublisher {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into().trim_end_matches('/').to_owned(),
        }
    }
}

/// Image name for a reference: last import-path segment, lowercased.
pub fn image_name(reference: &CanonicalReference) -> String {
    reference
        .import_path()
        .rsplit('/')
        .find(|segment| !segment.is_empty() && *segment != ".")
        .unwrap_or("image")
        .to_lowercase()
}

/// SHA-256 of a file, read in chunks; checks `cancel` between chunks.
pub async fn file_digest(cancel: &CancellationToken, path: &Path) -> Result<String, BackendError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| io_err(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        if cancel.is_cancelled() {
            return Err(BackendError::Cancelled {
                operation: format!("hashing {}", path.display()),
            });
        }
        let n = file.read(&mut buf).await.map_err(|e| io_err(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[async_trait]
impl Publisher<Artifact> for LocalPublisher {
    async fn publish(
        &self,
        cancel: &CancellationToken,
        artifact: Artifact,
        reference: &CanonicalReference,
    ) -> Result<ResolvedDigest, BoxError> {
        let path = match artifact {
            Artifact::Path(path) => path,
            Artifact::Image(image) => {
                return Err(BackendError::UnsupportedArtifact {
                    publisher: "local",
                    artifact: image,
                }
                .into());
            }
        };
        let hex = file_digest(cancel, &path).await?;
        let digest = format!("{}/{}@sha256:{hex}", self.repository, image_name(reference));
        tracing::debug!(reference = %reference, digest = %digest, "content-addressed locally");
        Ok(ResolvedDigest::from(digest))
    }
}
