//! `imagepin resolve`: build, publish and rewrite.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use imagepin_backend::{AnyBuilder, AnyPublisher};
use imagepin_core::ResolverConfig;
use imagepin_resolve::pipeline::{self, Emitted, Output, PipelineResult};
use imagepin_resolve::ManifestSource;

use super::{manifest_sources, ConfigArgs};

/// Arguments for `imagepin resolve`.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Manifest file to resolve; `-` reads stdin. Repeatable.
    #[arg(short = 'f', long = "filename", value_name = "PATH", required = true)]
    pub filenames: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Rewrite the files instead of printing to stdout.
    ///
    /// Files are re-serialized from parsed YAML: comments, quoting and key
    /// styling are not preserved.
    #[arg(long)]
    pub in_place: bool,
}

impl ResolveArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let sources = manifest_sources(&self.filenames);
        let output = if self.in_place {
            Output::InPlace
        } else {
            Output::Stdout
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        let result = runtime.block_on(resolve(config, sources, output))?;

        match result.emitted {
            Emitted::Rendered(text) => print!("{text}"),
            Emitted::Written(paths) => {
                println!(
                    "✓ pinned {} references ({} occurrences)",
                    result.resolution.references, result.resolution.occurrences
                );
                for path in paths {
                    println!("  ✎  {}", path.display());
                }
            }
        }
        Ok(())
    }
}

async fn resolve(
    config: ResolverConfig,
    sources: Vec<ManifestSource>,
    output: Output,
) -> Result<PipelineResult> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling builds");
                cancel.cancel();
            }
        })
    };

    let builder = Arc::new(AnyBuilder::from_config(&config));
    let publisher = Arc::new(AnyPublisher::from_config(&config));
    let result = pipeline::run(&cancel, &sources, builder, publisher, output).await;
    interrupt.abort();

    result.context("failed to resolve manifests")
}
