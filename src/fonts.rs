//! Font set resolution for web font service stylesheets
//!
//! A font service stylesheet names its binaries with `url(...)` tokens. Each
//! distinct binary is downloaded once (several at a time), base64 encoded and
//! substituted back into the stylesheet as a data URI. A binary that fails to
//! download keeps its remote URL.

use crate::config::InlineConfig;
use crate::error::InlineError;
use crate::fetch::Fetcher;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use futures::stream::{self, StreamExt};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// How one font URL is rendered in the rewritten stylesheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontMapping {
    pub url: String,
    /// `data:` URI on success, the original URL when the download failed
    pub inline_form: String,
}

impl FontMapping {
    pub fn is_inlined(&self) -> bool {
        self.inline_form != self.url
    }
}

/// Counts for the font files of one or more stylesheets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FontSet {
    pub found: usize,
    pub inlined: usize,
    pub failed: usize,
}

impl FontSet {
    pub fn add(&mut self, other: FontSet) {
        self.found += other.found;
        self.inlined += other.inlined;
        self.failed += other.failed;
    }
}

pub struct FontResolver {
    fetcher: Fetcher,
    font_url: Regex,
    concurrency: usize,
}

impl FontResolver {
    pub fn new(fetcher: Fetcher, config: &InlineConfig) -> Result<Self, InlineError> {
        let font_url = Regex::new(&format!(
            r#"url\(\s*['"]?({}[^)'"\s]+)['"]?\s*\)"#,
            regex::escape(&config.font_file_prefix)
        ))?;

        Ok(Self {
            fetcher,
            font_url,
            concurrency: config.font_concurrency.max(1),
        })
    }

    /// Distinct font binary URLs named in a stylesheet, first appearance first
    pub fn extract_font_urls(&self, css: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for cap in self.font_url.captures_iter(css) {
            let url = &cap[1];
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }

        urls
    }

    /// Rewrite a stylesheet with its font binaries embedded as data URIs
    pub async fn inline_fonts(&self, css: &str) -> (String, FontSet) {
        let urls = self.extract_font_urls(css);
        if urls.is_empty() {
            return (css.to_string(), FontSet::default());
        }

        info!("Downloading {} font files...", urls.len());

        let mappings: Vec<FontMapping> = stream::iter(urls)
            .map(|url| self.resolve(url))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let inlined = mappings.iter().filter(|m| m.is_inlined()).count();
        let set = FontSet {
            found: mappings.len(),
            inlined,
            failed: mappings.len() - inlined,
        };

        (self.apply_mappings(css, mappings), set)
    }

    /// Rewrite every `url(...)` token whose URL was inlined.
    ///
    /// Matching whole tokens keeps a URL that merely starts with another
    /// mapped URL intact.
    fn apply_mappings(&self, css: &str, mappings: Vec<FontMapping>) -> String {
        let inlined: HashMap<String, String> = mappings
            .into_iter()
            .filter(|m| m.is_inlined())
            .map(|m| (m.url, m.inline_form))
            .collect();

        self.font_url
            .replace_all(css, |cap: &Captures| match inlined.get(&cap[1]) {
                Some(inline_form) => cap[0].replacen(&cap[1], inline_form, 1),
                None => cap[0].to_string(),
            })
            .into_owned()
    }

    async fn resolve(&self, url: String) -> FontMapping {
        match self.fetcher.fetch_binary(&url).await {
            Ok(data) => {
                let inline_form = data_uri(&url, &data);
                info!("  font file {} ({}KB)", url, inline_form.len() / 1024);
                FontMapping { url, inline_form }
            }
            Err(e) => {
                warn!("Failed to download font file {}: {}", url, e);
                FontMapping {
                    inline_form: url.clone(),
                    url,
                }
            }
        }
    }
}

fn data_uri(url: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", font_mime_type(url), BASE64_STANDARD.encode(data))
}

/// MIME type from the font file extension, `font/woff2` when unknown
pub fn font_mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();

    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("woff2") => "font/woff2",
        Some("woff") => "font/woff",
        Some("ttf") => "font/ttf",
        Some("eot") => "application/vnd.ms-fontobject",
        _ => "font/woff2",
    }
}
