//! Reference scanning: find external fonts, scripts and stylesheets in HTML
//!
//! Matching is done with regular expressions over the raw text, never with a
//! DOM. Every call scans from the start of the document and returns the
//! references in order of appearance, each with the byte span it occupies.
//!
//! Also hosts the `scan` command, which lists what each stage would inline.

use crate::config::{FontServiceArgs, InlineConfig};
use crate::error::InlineError;
use anyhow::{Context, Result};
use clap::Args;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::path::PathBuf;
use url::{Origin, Url};

#[derive(Args)]
pub struct ScanArgs {
    /// HTML file to scan
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output format: json (default) or yaml
    #[arg(long, short, default_value = "json")]
    pub format: String,

    #[command(flatten)]
    pub font_service: FontServiceArgs,
}

/// Kind of external resource, in the order the pipeline resolves them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// `<link>` to the web font service stylesheet
    Font,
    /// `<script src=...></script>` with an absolute http(s) source
    Script,
    /// `<link>` to any other absolute http(s) `.css` file
    Stylesheet,
}

impl Category {
    /// Stage order of the pipeline
    pub const STAGES: [Category; 3] = [Category::Font, Category::Script, Category::Stylesheet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Font => "font",
            Category::Script => "script",
            Category::Stylesheet => "stylesheet",
        }
    }
}

/// One external reference found in a document snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReference {
    pub category: Category,
    /// Exact tag text as it appears in the scanned document
    pub original_fragment: String,
    /// Resource URL with HTML character references decoded
    pub url: String,
    /// Byte range of `original_fragment` in the scanned document
    pub span: Range<usize>,
}

/// Compiled patterns for all three categories
#[derive(Debug, Clone)]
pub struct Scanner {
    font_link: Regex,
    script: Regex,
    stylesheet: Regex,
    font_origin: Origin,
}

impl Scanner {
    pub fn new(config: &InlineConfig) -> Result<Self, InlineError> {
        let font_origin = Url::parse(&config.font_css_prefix)
            .map_err(|source| InlineError::FontPrefix {
                prefix: config.font_css_prefix.clone(),
                source,
            })?
            .origin();

        let font_link = Regex::new(&format!(
            r#"<link[^>]*href=['"]({}[^'"]*)['"][^>]*>"#,
            regex::escape(&config.font_css_prefix)
        ))?;
        let script = Regex::new(r#"<script[^>]*src=['"](https?://[^'"]*)['"][^>]*></script>"#)?;
        let stylesheet = Regex::new(r#"<link[^>]*href=['"](https?://[^'"]*\.css[^'"]*)['"][^>]*>"#)?;

        Ok(Self {
            font_link,
            script,
            stylesheet,
            font_origin,
        })
    }

    /// All references of one category, in document order
    pub fn scan(&self, document: &str, category: Category) -> Vec<ResourceReference> {
        let pattern = match category {
            Category::Font => &self.font_link,
            Category::Script => &self.script,
            Category::Stylesheet => &self.stylesheet,
        };

        pattern
            .captures_iter(document)
            .filter_map(|cap| {
                let whole = cap.get(0)?;
                let url = html_escape::decode_html_entities(cap.get(1)?.as_str()).into_owned();

                // Font service links belong to the font stage only
                if category == Category::Stylesheet && self.is_font_service(&url) {
                    return None;
                }

                Some(ResourceReference {
                    category,
                    original_fragment: whole.as_str().to_string(),
                    url,
                    span: whole.range(),
                })
            })
            .collect()
    }

    /// References of every category, grouped in stage order
    pub fn scan_all(&self, document: &str) -> Vec<ResourceReference> {
        Category::STAGES
            .iter()
            .flat_map(|category| self.scan(document, *category))
            .collect()
    }

    fn is_font_service(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| u.origin() == self.font_origin)
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub file: String,
    pub total: usize,
    pub references: Vec<ResourceReference>,
}

/// Run the scan command
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let document = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let scanner = Scanner::new(&args.font_service.into_config())?;
    let references = scanner.scan_all(&document);

    let output = ScanOutput {
        file: args.input.display().to_string(),
        total: references.len(),
        references,
    };

    let rendered = match args.format.as_str() {
        "yaml" | "yml" => serde_yaml::to_string(&output)?,
        _ => serde_json::to_string_pretty(&output)?,
    };
    println!("{}", rendered);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> Scanner {
        Scanner::new(&InlineConfig::default()).unwrap()
    }

    #[test]
    fn test_scan_font_links() {
        let html = r#"<head>
<link href="https://fonts.googleapis.com/css2?family=Roboto&amp;display=swap" rel="stylesheet">
<link rel="stylesheet" href='https://fonts.googleapis.com/css?family=Lato'>
</head>"#;

        let refs = scanner().scan(html, Category::Font);
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[0].url,
            "https://fonts.googleapis.com/css2?family=Roboto&display=swap"
        );
        assert_eq!(refs[1].url, "https://fonts.googleapis.com/css?family=Lato");
        for r in &refs {
            assert_eq!(&html[r.span.clone()], r.original_fragment);
            assert_eq!(r.category, Category::Font);
        }
    }

    #[test]
    fn test_scan_scripts() {
        let html = r#"<script src="https://cdn.example.com/a.js"></script>
<script>inline()</script>
<script data-source="x" src='http://cdn.example.com/b.js' async></script>
<script src="/local.js"></script>"#;

        let refs = scanner().scan(html, Category::Script);
        let urls: Vec<&str> = refs.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://cdn.example.com/a.js", "http://cdn.example.com/b.js"]
        );
        assert_eq!(
            refs[0].original_fragment,
            r#"<script src="https://cdn.example.com/a.js"></script>"#
        );
    }

    #[test]
    fn test_self_closing_script_not_matched() {
        let html = r#"<script src="https://cdn.example.com/a.js"/>"#;
        assert!(scanner().scan(html, Category::Script).is_empty());
    }

    #[test]
    fn test_scan_stylesheets_excludes_font_service() {
        let html = r#"<link href="https://fonts.googleapis.com/css?family=Lato.css" rel="stylesheet">
<link rel="stylesheet" href="https://cdn.example.com/theme.css?v=3">
<link rel="icon" href="https://cdn.example.com/favicon.ico">
<link rel="stylesheet" href="local.css">"#;

        let refs = scanner().scan(html, Category::Stylesheet);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://cdn.example.com/theme.css?v=3");
    }

    #[test]
    fn test_scan_is_restartable() {
        let html = r#"<script src="https://a.test/1.js"></script><script src="https://a.test/2.js"></script>"#;
        let s = scanner();
        let first = s.scan(html, Category::Script);
        let second = s.scan(html, Category::Script);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first[0].span.end <= first[1].span.start);
    }

    #[test]
    fn test_scan_all_stage_order() {
        let html = r#"<link rel="stylesheet" href="https://cdn.example.com/a.css">
<script src="https://cdn.example.com/a.js"></script>
<link href="https://fonts.googleapis.com/css?family=Lato" rel="stylesheet">"#;

        let categories: Vec<Category> = scanner()
            .scan_all(html)
            .iter()
            .map(|r| r.category)
            .collect();
        assert_eq!(
            categories,
            vec![Category::Font, Category::Script, Category::Stylesheet]
        );
    }

    #[test]
    fn test_custom_font_prefix() {
        let config = InlineConfig {
            font_css_prefix: "http://127.0.0.1:8080/css".to_string(),
            ..InlineConfig::default()
        };
        let s = Scanner::new(&config).unwrap();
        let html = r#"<link href="http://127.0.0.1:8080/css?family=A" rel="stylesheet"><link href="http://127.0.0.1:8080/other.css" rel="stylesheet">"#;

        assert_eq!(s.scan(html, Category::Font).len(), 1);
        // Same origin as the font service, so never a generic stylesheet
        assert!(s.scan(html, Category::Stylesheet).is_empty());
    }

    #[test]
    fn test_invalid_font_prefix() {
        let config = InlineConfig {
            font_css_prefix: "not a url".to_string(),
            ..InlineConfig::default()
        };
        assert!(matches!(
            Scanner::new(&config),
            Err(InlineError::FontPrefix { .. })
        ));
    }
}
