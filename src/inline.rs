//! inline command: Make a built HTML file self-contained
//!
//! Reads the document, runs the pipeline once and writes the result.
//! Inlining problems are logged, never fatal; only file I/O can fail.

use crate::config::ConfigArgs;
use crate::pipeline::{inline_document_with_report, InlineReport};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InlineArgs {
    /// HTML file produced by the build
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the self-contained document
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Debug, Serialize)]
pub struct InlineOutput {
    pub input: String,
    pub output: String,
    #[serde(flatten)]
    pub report: InlineReport,
}

/// Run the inline command
pub async fn run_inline(args: InlineArgs) -> Result<()> {
    let document = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let config = args.config.into_config();
    let (document, report) = inline_document_with_report(document, &config).await;

    tokio::fs::write(&args.output, &document)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let output = InlineOutput {
        input: args.input.display().to_string(),
        output: args.output.display().to_string(),
        report,
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
