//! imagepin: resolve `ko://` image references in YAML manifests.
//!
//! # Usage
//!
//! ```text
//! imagepin resolve -f <path|->... [--config <path>] [--in-place]
//! imagepin refs -f <path|->... [--config <path>] [--json]
//! imagepin init [--dir <dir>] [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, refs::RefsArgs, resolve::ResolveArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "imagepin",
    version,
    about = "Build, publish and pin ko:// image references in Kubernetes manifests",
    long_about = None,
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and publish every reference, then print or rewrite the manifests.
    Resolve(ResolveArgs),

    /// List the references found in manifests without building anything.
    Refs(RefsArgs),

    /// Write a default .imagepin.yaml.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Resolve(args) => args.run(),
        Commands::Refs(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}

/// Logs go to stderr; stdout is reserved for manifests and reports.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
