//! DRYDOCK CLI
//!
//! One positional argument: the path to a task manifest. The whole manifest
//! runs against a fresh local workspace; any unrecovered failure exits
//! non-zero.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::Parser;
use color_eyre::Result;
use console::style;
use drydock_core::OutputSink;
use drydock_harness::{Orchestrator, WORKSPACE_DIR_NAME};
use drydock_manifest::load_manifest;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "drydock")]
#[command(about = "Dry-run proving harness for batch SQL task manifests", long_about = None)]
struct Cli {
    /// Path to the manifest file
    manifest: PathBuf,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drydock=warn".into()),
        )
        .init();

    let start = Instant::now();

    let manifest = load_manifest(&cli.manifest)?;
    let workspace_root = env::current_dir()?.join(WORKSPACE_DIR_NAME);

    let mut orchestrator = Orchestrator::new(manifest, workspace_root, OutputSink::stdout());
    orchestrator.run()?;

    println!(
        "{}",
        style(format!("> Total time:  {}ms", start.elapsed().as_millis())).bold()
    );
    Ok(())
}
