//! resource-inliner: Make generated HTML documents self-contained
//!
//! External web fonts, scripts and stylesheets are fetched once and embedded
//! in the document as `<style>` blocks, inline `<script>` blocks and
//! `data:` URIs.
//!
//! Commands:
//! - inline: Inline the external resources of an HTML file
//! - scan: List the external references each stage would inline

pub mod config;
pub mod error;
pub mod fetch;
pub mod fonts;
pub mod inline;
pub mod pipeline;
pub mod scan;

pub use config::InlineConfig;
pub use error::{FetchError, InlineError};
pub use fetch::Fetcher;
pub use fonts::{FontMapping, FontResolver, FontSet};
pub use pipeline::{
    inline_document, inline_document_with_report, InlineReport, Inliner, StageCounts,
};
pub use scan::{Category, ResourceReference, Scanner};
