//! HTTP fetch primitive with bounded retries.
//!
//! Both the version manifest and the changelog articles are fetched through
//! [`HttpFetcher::get`], which retries transport failures and non-success
//! statuses a fixed number of times with a fixed backoff, then classifies
//! the body by its `Content-Type`.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, instrument, warn};

use crate::config::WatchConfig;
use crate::error::FetchError;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("mcnotify/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A successfully fetched response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Body served as `application/json`.
    Json(serde_json::Value),
    /// Body served as `text/html`.
    Html(String),
}

/// GET requests with a fixed retry budget.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    tries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with its own HTTP client.
    ///
    /// `tries` is clamped to at least one attempt.
    ///
    /// ## Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be built.
    pub fn new(tries: u32, backoff: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::with_client(client, tries, backoff))
    }

    /// Creates a fetcher using the retry settings of a [`WatchConfig`].
    ///
    /// ## Errors
    ///
    /// Returns `FetchError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &WatchConfig) -> Result<Self, FetchError> {
        Self::new(config.fetch_tries, config.fetch_backoff)
    }

    /// Creates a fetcher around an existing client.
    pub fn with_client(client: Client, tries: u32, backoff: Duration) -> Self {
        Self {
            client,
            tries: tries.max(1),
            backoff,
        }
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches `url`, retrying failed attempts.
    ///
    /// ## Errors
    ///
    /// - `FetchError::Exhausted` - every attempt failed
    /// - `FetchError::UnsupportedContentType` - the body is neither JSON nor HTML
    /// - `FetchError::Body` - the body could not be read or decoded
    #[instrument(skip(self), fields(tries = self.tries))]
    pub async fn get(&self, url: &str) -> Result<Document, FetchError> {
        for attempt in 1..=self.tries {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, status = response.status().as_u16(), "Fetched");
                    return classify(url, response).await;
                }
                Ok(response) => {
                    warn!(
                        attempt,
                        status = response.status().as_u16(),
                        "Error fetching {}",
                        url
                    );
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Error fetching {}", url);
                }
            }

            if attempt < self.tries {
                warn!("Retrying in {} seconds", self.backoff.as_secs());
                tokio::time::sleep(self.backoff).await;
            }
        }

        error!("Error fetching {}. No more tries", url);
        Err(FetchError::Exhausted {
            url: url.to_string(),
            tries: self.tries,
        })
    }
}

/// Turns a successful response into a [`Document`] based on its media type.
async fn classify(url: &str, response: reqwest::Response) -> Result<Document, FetchError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/json" => Ok(Document::Json(response.json().await?)),
        "text/html" => Ok(Document::Html(response.text().await?)),
        _ => {
            error!(content_type = %content_type, "Error detecting Content-Type for {}", url);
            Err(FetchError::UnsupportedContentType {
                url: url.to_string(),
                content_type,
            })
        }
    }
}
