//! Markup — render pipe-driven text templates from the command line.
//!
//! # Usage
//!
//! ```text
//! markup render <TEMPLATE|-> [--context FILE] [--include NAME=FILE]... [--compact] [--output FILE]
//! markup check <TEMPLATE>...
//! markup pipes [--json]
//! ```
//!
//! `--config FILE` and `-v/--verbose` apply to every command.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{check::CheckArgs, pipes::PipesArgs, render::RenderArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "markup",
    version,
    about = "Render text templates with {{tags}}, sections and pipes",
    long_about = None,
)]
struct Cli {
    /// Configuration file (default: ~/.markup/config.yaml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log unresolved paths and pipe failures to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template against a JSON or YAML context.
    Render(RenderArgs),

    /// Parse templates and report structural errors.
    Check(CheckArgs),

    /// List the built-in pipes.
    Pipes(PipesArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Render(args) => args.run(cli.config.as_deref()),
        Commands::Check(args) => args.run(),
        Commands::Pipes(args) => args.run(),
    }
}
