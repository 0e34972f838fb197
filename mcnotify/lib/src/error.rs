//! Error types for the mcnotify library.
//!
//! Every failure the watcher can hit maps onto one of these enums. None of
//! them terminate the polling loop; they are logged and turned into a
//! [`PollOutcome`](crate::PollOutcome) instead.

use thiserror::Error;

/// Errors returned by the HTTP fetch primitive.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed with a transport error or a non-success status.
    #[error("failed to fetch {url} after {tries} tries")]
    Exhausted {
        /// The URL that could not be fetched.
        url: String,
        /// How many attempts were made.
        tries: u32,
    },

    /// The server answered with a body we do not know how to interpret.
    #[error("unsupported content type for {url}: {content_type}")]
    UnsupportedContentType {
        /// The URL that was fetched.
        url: String,
        /// The `Content-Type` header value (empty when missing).
        content_type: String,
    },

    /// Failed to read or decode the response body.
    #[error("failed to read response body: {0}")]
    Body(#[from] reqwest::Error),

    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Errors raised while looking up the latest published version.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The manifest could not be fetched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The manifest was fetched but did not have the expected shape.
    #[error("malformed version manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The manifest was served as something other than JSON.
    #[error("version manifest at {url} is not a JSON document")]
    NotJson {
        /// The manifest URL.
        url: String,
    },

    /// The manifest lists no versions at all.
    #[error("version manifest lists no versions")]
    EmptyManifest,
}

/// Errors that can occur when persisting the last-seen version.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to write the version file.
    #[error("failed to write version file: {0}")]
    Write(#[from] std::io::Error),

    /// Failed to serialize the version record.
    #[error("failed to serialize version record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to move the temporary file into place.
    #[error("failed to replace version file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Errors returned when delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request never reached the chat API.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The chat API answered with a non-success status.
    #[error("notification rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body, usually a JSON error description.
        body: String,
    },
}

/// Errors raised while building a [`WatchConfig`](crate::WatchConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting was provided but could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The environment variable or flag name.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}
