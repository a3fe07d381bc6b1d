pub mod init;
pub mod refs;
pub mod resolve;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use imagepin_core::{config, ResolverConfig};
use imagepin_resolve::ManifestSource;

/// `--config`, shared by commands that need backends.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config file to use instead of ./.imagepin.yaml.
    #[arg(long, env = "IMAGEPIN_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<ResolverConfig> {
        match &self.config {
            Some(path) => config::load(path)
                .with_context(|| format!("failed to load config '{}'", path.display())),
            None => config::load_current().context("failed to load .imagepin.yaml"),
        }
    }
}

pub fn manifest_sources(filenames: &[PathBuf]) -> Vec<ManifestSource> {
    filenames
        .iter()
        .map(|path| ManifestSource::from_arg(path.clone()))
        .collect()
}
