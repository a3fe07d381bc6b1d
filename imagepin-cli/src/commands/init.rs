//! `imagepin init [--dir <dir>] [--force]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use imagepin_core::{config, ResolverConfig};

/// Write a default `.imagepin.yaml`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to create the config in.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing config.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let path = config::config_path_at(&self.dir);
        if path.exists() && !self.force {
            bail!(
                "'{}' already exists; pass --force to overwrite it",
                path.display()
            );
        }

        let written = config::save_at(&self.dir, &ResolverConfig::default())
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        println!("✓ Wrote {}", written.display());
        println!("  Add pins or switch builder.kind to `command` to start resolving.");
        Ok(())
    }
}
