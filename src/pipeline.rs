//! Document rewriting pipeline
//!
//! Three stages run in a fixed order over the working document:
//!
//! 1. font service links become `<style>` blocks with embedded font binaries
//! 2. external scripts become inline `<script>` blocks
//! 3. remaining external stylesheets become `<style>` blocks
//!
//! Each stage scans the document produced by the previous one and processes
//! its references one at a time, in document order. A reference that cannot
//! be fetched is left exactly as it was. Nothing in here fails the caller:
//! the worst case is the input document coming back unchanged.

use crate::config::InlineConfig;
use crate::error::{FetchError, InlineError};
use crate::fetch::Fetcher;
use crate::fonts::{FontResolver, FontSet};
use crate::scan::{Category, ResourceReference, Scanner};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

/// Per-stage reference counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub found: usize,
    pub inlined: usize,
    pub failed: usize,
}

/// What one pipeline run did to a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineReport {
    pub fonts: StageCounts,
    pub scripts: StageCounts,
    pub stylesheets: StageCounts,
    pub font_files: FontSet,
    pub input_bytes: usize,
    pub output_bytes: usize,
}

impl InlineReport {
    /// Report for a document returned as-is
    pub fn unchanged(document: &str) -> Self {
        Self {
            input_bytes: document.len(),
            output_bytes: document.len(),
            ..Self::default()
        }
    }

    pub fn stage(&self, category: Category) -> &StageCounts {
        match category {
            Category::Font => &self.fonts,
            Category::Script => &self.scripts,
            Category::Stylesheet => &self.stylesheets,
        }
    }

    fn stage_mut(&mut self, category: Category) -> &mut StageCounts {
        match category {
            Category::Font => &mut self.fonts,
            Category::Script => &mut self.scripts,
            Category::Stylesheet => &mut self.stylesheets,
        }
    }

    /// References left pointing at the network, including fallback font files
    pub fn total_failed(&self) -> usize {
        self.fonts.failed + self.scripts.failed + self.stylesheets.failed + self.font_files.failed
    }
}

/// Resolves and inlines the external resources of HTML documents
pub struct Inliner {
    fetcher: Fetcher,
    scanner: Scanner,
    fonts: FontResolver,
}

impl Inliner {
    pub fn new(config: &InlineConfig) -> Result<Self, InlineError> {
        let fetcher = Fetcher::new(config)?;
        let scanner = Scanner::new(config)?;
        let fonts = FontResolver::new(fetcher.clone(), config)?;

        Ok(Self {
            fetcher,
            scanner,
            fonts,
        })
    }

    /// Inline every reachable external resource of `document`
    pub async fn process(&self, document: String) -> String {
        self.process_with_report(document).await.0
    }

    /// Like [`process`](Self::process), also returning what was done.
    ///
    /// A panic anywhere in the stages is caught here and the original
    /// document is returned.
    pub async fn process_with_report(&self, document: String) -> (String, InlineReport) {
        let original = document.clone();

        match AssertUnwindSafe(self.run(document)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => {
                error!("Failed to process external resources, keeping original document");
                let report = InlineReport::unchanged(&original);
                (original, report)
            }
        }
    }

    async fn run(&self, document: String) -> (String, InlineReport) {
        info!("Processing external resources...");

        let mut report = InlineReport {
            input_bytes: document.len(),
            ..InlineReport::default()
        };

        let mut document = document;
        for category in Category::STAGES {
            document = self.run_stage(document, category, &mut report).await;
        }

        report.output_bytes = document.len();
        info!(
            "Finished processing external resources ({}KB)",
            document.len() / 1024
        );

        (document, report)
    }

    /// Scan one category and splice inline replacements over the matched spans
    async fn run_stage(
        &self,
        document: String,
        category: Category,
        report: &mut InlineReport,
    ) -> String {
        let references = self.scanner.scan(&document, category);
        debug!("{} {} references", references.len(), category.as_str());

        if references.is_empty() {
            return document;
        }

        let mut out = String::with_capacity(document.len());
        let mut cursor = 0;

        for reference in &references {
            out.push_str(&document[cursor..reference.span.start]);
            info!("Inlining {} {}", category.as_str(), reference.url);

            let outcome = self.inline_reference(reference).await;
            let counts = report.stage_mut(category);
            counts.found += 1;

            match outcome {
                Ok((fragment, font_files)) => {
                    counts.inlined += 1;
                    report.font_files.add(font_files);
                    info!("  inlined {}KB", fragment.len() / 1024);
                    out.push_str(&fragment);
                }
                Err(e) => {
                    counts.failed += 1;
                    warn!("Failed to inline {} {}: {}", category.as_str(), reference.url, e);
                    out.push_str(&reference.original_fragment);
                }
            }

            cursor = reference.span.end;
        }

        out.push_str(&document[cursor..]);
        out
    }

    async fn inline_reference(
        &self,
        reference: &ResourceReference,
    ) -> Result<(String, FontSet), FetchError> {
        let content = self.fetcher.fetch_text(&reference.url).await?;

        match reference.category {
            Category::Font => {
                let (css, font_files) = self.fonts.inline_fonts(&content).await;
                Ok((style_block(&css), font_files))
            }
            Category::Script => Ok((script_block(&content), FontSet::default())),
            Category::Stylesheet => Ok((style_block(&content), FontSet::default())),
        }
    }
}

/// Build an [`Inliner`] and run it once.
///
/// If the inliner cannot be built the document is returned unchanged.
pub async fn inline_document_with_report(
    document: String,
    config: &InlineConfig,
) -> (String, InlineReport) {
    match Inliner::new(config) {
        Ok(inliner) => inliner.process_with_report(document).await,
        Err(e) => {
            error!("Failed to process external resources: {}", e);
            let report = InlineReport::unchanged(&document);
            (document, report)
        }
    }
}

pub async fn inline_document(document: String, config: &InlineConfig) -> String {
    inline_document_with_report(document, config).await.0
}

fn style_block(css: &str) -> String {
    format!(r#"<style type="text/css">{}</style>"#, css)
}

fn script_block(js: &str) -> String {
    format!(r#"<script type="text/javascript">{}</script>"#, js)
}
