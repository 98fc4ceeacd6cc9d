//! The network seam: fetch the bytes behind a URL under a timeout.
//!
//! The pipeline only ever talks to a [`Fetcher`]. [`HttpFetcher`] is the
//! `reqwest` implementation used in production; tests inject an in-memory
//! fetcher so every discovery and failure path runs without a network.

use crate::config::FetchConfig;
use crate::error::{Embed2PdfError, PageError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a single request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request exceeded the per-request timeout.
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),
    /// Anything else: DNS, connect, TLS, body read.
    #[error("{0}")]
    Transport(String),
}

impl FetchError {
    /// Attach the page context, turning a transport failure into a [`PageError`].
    pub fn into_page_error(self, seq: u32, url: &str) -> PageError {
        let url = url.to_string();
        match self {
            FetchError::Timeout { secs } => PageError::Timeout { seq, url, secs },
            FetchError::Status(status) => PageError::HttpStatus { seq, url, status },
            FetchError::Transport(detail) => PageError::FetchFailed { seq, url, detail },
        }
    }

    /// Promote a descriptor failure to the fatal error it causes.
    pub fn into_fatal(self, url: &str) -> Embed2PdfError {
        match self {
            FetchError::Timeout { secs } => Embed2PdfError::DescriptorTimeout {
                url: url.to_string(),
                secs,
            },
            other => Embed2PdfError::DescriptorFetchFailed {
                url: url.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Fetch bytes from a URL.
///
/// Implementations must treat any non-success status as an error and apply
/// their own timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Fetch a textual body. Invalid UTF-8 is replaced, not rejected.
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// `reqwest`-backed [`Fetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, Embed2PdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Embed2PdfError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!("GET {} → {} bytes", url, bytes.len());
        Ok(bytes.to_vec())
    }
}
