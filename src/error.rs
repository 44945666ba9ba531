//! Error kinds for fetching and inliner setup

use thiserror::Error;

/// Why a single resource could not be fetched.
///
/// Callers treat every variant the same way: the reference that needed the
/// resource stays in the document untouched.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("redirect loop: gave up on {url} after {hops} redirects")]
    RedirectLoop { url: String, hops: usize },

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported scheme for {url}")]
    UnsupportedScheme { url: String },
}

impl FetchError {
    /// The URL the failure is attributed to (the last hop for redirects)
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::RedirectLoop { url, .. }
            | FetchError::InvalidUrl { url, .. }
            | FetchError::UnsupportedScheme { url } => url,
        }
    }
}

/// Failures while building an [`Inliner`](crate::Inliner).
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid scan pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid font service prefix {prefix}: {source}")]
    FontPrefix {
        prefix: String,
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = FetchError::Status {
            url: "https://cdn.example.com/a.js".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 for https://cdn.example.com/a.js");
        assert_eq!(err.url(), "https://cdn.example.com/a.js");
    }

    #[test]
    fn test_redirect_loop_message() {
        let err = FetchError::RedirectLoop {
            url: "http://loop.test/a".to_string(),
            hops: 10,
        };
        assert!(err.to_string().contains("after 10 redirects"));
    }
}
