//! Inliner configuration

use clap::builder::TypedValueParser;
use clap::Args;
use std::time::Duration;

/// Desktop browser user agent; some font and CDN origins reject unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Stylesheet endpoint of the web font service (also matches `/css2`)
pub const DEFAULT_FONT_CSS_PREFIX: &str = "https://fonts.googleapis.com/css";

/// Host serving the font binaries named inside font service stylesheets
pub const DEFAULT_FONT_FILE_PREFIX: &str = "https://fonts.gstatic.com/";

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

pub const DEFAULT_FONT_CONCURRENCY: usize = 8;

/// Configuration shared by the fetcher, scanner and font resolver
#[derive(Debug, Clone)]
pub struct InlineConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Links whose href starts with this are font service stylesheets
    pub font_css_prefix: String,
    /// `url(...)` tokens starting with this are font binaries to embed
    pub font_file_prefix: String,
    /// Redirect hops followed before giving up with `RedirectLoop`
    pub max_redirects: usize,
    /// Font files fetched at once for a single stylesheet
    pub font_concurrency: usize,
    /// Per-request timeout (none by default)
    pub timeout: Option<Duration>,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            font_css_prefix: DEFAULT_FONT_CSS_PREFIX.to_string(),
            font_file_prefix: DEFAULT_FONT_FILE_PREFIX.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            font_concurrency: DEFAULT_FONT_CONCURRENCY,
            timeout: None,
        }
    }
}

/// Where the web font service lives; all that scanning needs
#[derive(Args, Debug, Clone)]
pub struct FontServiceArgs {
    /// Stylesheet endpoint of the web font service
    #[arg(long, default_value = DEFAULT_FONT_CSS_PREFIX)]
    pub font_css_prefix: String,

    /// URL prefix of font binaries to embed
    #[arg(long, default_value = DEFAULT_FONT_FILE_PREFIX)]
    pub font_file_prefix: String,
}

impl FontServiceArgs {
    /// Default config with these font service prefixes
    pub fn into_config(self) -> InlineConfig {
        InlineConfig {
            font_css_prefix: self.font_css_prefix,
            font_file_prefix: self.font_file_prefix,
            ..InlineConfig::default()
        }
    }
}

/// Command line knobs mapped onto [`InlineConfig`]
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// User-Agent header sent with every request
    #[arg(long, env = "INLINER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    #[command(flatten)]
    pub font_service: FontServiceArgs,

    /// Redirects followed per request
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Font files downloaded in parallel per stylesheet (1-64)
    #[arg(long, default_value_t = DEFAULT_FONT_CONCURRENCY, value_parser = clap::value_parser!(u8).range(1..=64).map(usize::from))]
    pub font_concurrency: usize,

    /// Timeout per request in milliseconds (no timeout if omitted)
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl ConfigArgs {
    pub fn into_config(self) -> InlineConfig {
        InlineConfig {
            user_agent: self.user_agent,
            font_css_prefix: self.font_service.font_css_prefix,
            font_file_prefix: self.font_service.font_file_prefix,
            max_redirects: self.max_redirects,
            font_concurrency: self.font_concurrency,
            timeout: self.timeout.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn test_defaults_match_config_default() {
        let cli = TestCli::try_parse_from(["test"]).unwrap();
        let config = cli.config.into_config();
        let default = InlineConfig::default();

        assert_eq!(config.user_agent, default.user_agent);
        assert_eq!(config.font_css_prefix, default.font_css_prefix);
        assert_eq!(config.font_file_prefix, default.font_file_prefix);
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.font_concurrency, 8);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_timeout_in_millis() {
        let cli = TestCli::try_parse_from(["test", "--timeout", "1500"]).unwrap();
        assert_eq!(
            cli.config.into_config().timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_font_service_args_keep_other_defaults() {
        #[derive(Parser)]
        struct ScanCli {
            #[command(flatten)]
            font_service: FontServiceArgs,
        }

        let cli = ScanCli::try_parse_from(["test", "--font-css-prefix", "http://fonts.test/css"])
            .unwrap();
        let config = cli.font_service.into_config();
        assert_eq!(config.font_css_prefix, "http://fonts.test/css");
        assert_eq!(config.font_file_prefix, DEFAULT_FONT_FILE_PREFIX);
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);

        assert!(ScanCli::try_parse_from(["test", "--user-agent", "x"]).is_err());
    }

    #[test]
    fn test_font_concurrency_range() {
        assert!(TestCli::try_parse_from(["test", "--font-concurrency", "0"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--font-concurrency", "65"]).is_err());
        assert!(TestCli::try_parse_from(["test", "--font-concurrency", "4"]).is_ok());
    }
}
