//! HTTP fetching for external resources
//!
//! Plain GET requests with a browser user agent. Redirects are followed by
//! hand so the hop count is bounded; anything but a final `200` is a failure.

use crate::config::InlineConfig;
use crate::error::FetchError;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

/// HTTP client used for every resource the inliner downloads
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_redirects: usize,
}

impl Fetcher {
    pub fn new(config: &InlineConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(Policy::none()); // Followed manually in `get`

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            max_redirects: config.max_redirects,
        })
    }

    /// Fetch a URL and decode the body as text
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let (final_url, response) = self.get(url).await?;
        response.text().await.map_err(|source| FetchError::Transport {
            url: final_url.to_string(),
            source,
        })
    }

    /// Fetch a URL and return the raw body bytes
    pub async fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let (final_url, response) = self.get(url).await?;
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| FetchError::Transport {
                url: final_url.to_string(),
                source,
            })
    }

    /// Send the GET, following up to `max_redirects` redirects.
    ///
    /// Returns the final URL together with its `200` response.
    async fn get(&self, url: &str) -> Result<(Url, Response), FetchError> {
        let mut current = parse_http_url(url)?;
        let mut hops = 0_usize;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(|source| FetchError::Transport {
                    url: current.to_string(),
                    source,
                })?;
            let status = response.status();

            if is_redirect_status(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if let Some(location) = location {
                    if hops >= self.max_redirects {
                        return Err(FetchError::RedirectLoop {
                            url: current.to_string(),
                            hops,
                        });
                    }

                    let next = current
                        .join(&location)
                        .map_err(|source| FetchError::InvalidUrl {
                            url: location.clone(),
                            source,
                        })?;
                    debug!("{} {} -> {}", status.as_u16(), current, next);

                    current = ensure_http(next)?;
                    hops += 1;
                    continue;
                }
            }

            if status != StatusCode::OK {
                return Err(FetchError::Status {
                    url: current.to_string(),
                    status: status.as_u16(),
                });
            }

            return Ok((current, response));
        }
    }
}

/// Statuses whose `Location` is followed (never `304`)
fn is_redirect_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn parse_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    ensure_http(parsed)
}

fn ensure_http(url: Url) -> Result<Url, FetchError> {
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
        }),
    }
}
