//! inliner CLI
//!
//! Turns a built HTML file into a self-contained document.
//! Logs go to stderr, the JSON report to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use resource_inliner::inline::{run_inline, InlineArgs};
use resource_inliner::scan::{run_scan, ScanArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "inliner")]
#[command(author = "RoyalBit Inc.")]
#[command(version)]
#[command(about = "Inline remote fonts, scripts and stylesheets into HTML")]
#[command(long_about = "Fetches every external web font, script and stylesheet an HTML file references and embeds it, so the document needs no network at runtime.\n\nCommands:\n  inline   Inline the external resources of an HTML file\n  scan     List the external references without fetching them")]
struct Cli {
    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inline the external resources of an HTML file
    Inline(InlineArgs),
    /// List the external references each stage would inline
    Scan(ScanArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Inline(args) => run_inline(args).await,
        Commands::Scan(args) => run_scan(args).await,
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("resource_inliner=info,warn"),
            1 => EnvFilter::new("resource_inliner=debug,info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
