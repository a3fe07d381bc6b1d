//! Build/publish fan-out.
//!
//! One task per distinct canonical reference, all joined before returning.
//! The first failure cancels the shared token; later failures are logged and
//! dropped so the caller sees exactly one error.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use imagepin_core::{Builder, CanonicalReference, Publisher, ResolveError, ResolvedDigest};

/// Canonical reference → published image reference.
pub type DigestMap = HashMap<CanonicalReference, ResolvedDigest>;

/// Build and publish every reference concurrently.
///
/// Returns a map with one entry per input reference, or the first error.
pub async fn build_and_publish<B, P>(
    cancel: &CancellationToken,
    references: impl IntoIterator<Item = CanonicalReference>,
    builder: Arc<B>,
    publisher: Arc<P>,
) -> Result<DigestMap, ResolveError>
where
    B: Builder + 'static,
    P: Publisher<B::Artifact> + 'static,
{
    let group = cancel.child_token();
    let mut tasks = JoinSet::new();

    for reference in references {
        let builder = Arc::clone(&builder);
        let publisher = Arc::clone(&publisher);
        let token = group.clone();
        tasks.spawn(async move {
            let artifact = builder.build(&token, &reference).await.map_err(|source| {
                ResolveError::Build {
                    reference: reference.to_string(),
                    source,
                }
            })?;
            let digest = publisher
                .publish(&token, artifact, &reference)
                .await
                .map_err(|source| ResolveError::Publish {
                    reference: reference.to_string(),
                    source,
                })?;
            Ok::<_, ResolveError>((reference, digest))
        });
    }

    let mut digests = DigestMap::with_capacity(tasks.len());
    let mut first_error: Option<ResolveError> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .map_err(|e| ResolveError::Task(e.to_string()))
            .and_then(|result| result);
        match outcome {
            Ok((reference, digest)) => {
                tracing::info!(reference = %reference, digest = %digest, "resolved reference");
                digests.insert(reference, digest);
            }
            Err(err) if first_error.is_none() => {
                tracing::debug!(error = %err, "resolution failed, cancelling remaining tasks");
                group.cancel();
                first_error = Some(err);
            }
            Err(err) => {
                tracing::debug!(error = %err, "dropping secondary resolution error");
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(digests),
    }
}
