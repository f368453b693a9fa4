//! Error taxonomy for crawl, download and annotation operations.
//!
//! Errors never cross task boundaries: each paper task contains its own
//! failures and reports them through a [`crate::models::DownloadResult`].
//! Only configuration problems and an unreachable root page abort a run.

use std::path::PathBuf;

/// Every failure the scraper can observe.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// Transport-level failure: timeout, connection reset, TLS, body read.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The server (or model API) signalled that we are sending too much.
    #[error("rate limited by {url}: {message}")]
    RateLimited { url: String, message: String },

    /// An expected link or element is missing from the page.
    #[error("no {what} found at {url}")]
    ContentMismatch { url: String, what: &'static str },

    /// Directory creation or file write failed.
    #[error("I/O error at {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The retry budget is spent; the task is abandoned.
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    ExhaustedRetries {
        url: String,
        attempts: u32,
        last: Box<ScrapeError>,
    },

    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),

    /// Unparseable payload (URL, selector or model reply).
    #[error("parse error: {0}")]
    Parse(String),
}

impl ScrapeError {
    pub fn request(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Request {
            url: url.into(),
            source,
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt of the same operation could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Request { .. }
                | Self::Status { .. }
                | Self::RateLimited { .. }
                | Self::Persistence { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
