//! Domain error type for the proxy pipeline.

use thiserror::Error;

/// Errors produced by the URL rewriter, cache, fetcher, prefetcher and
/// extraction adapter. Never carries framework types (`axum`, `reqwest`)
/// across the HTTP boundary directly — the server crate's `ApiError`
/// converts from this.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid upstream url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("upstream request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error("upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("network error contacting upstream: {0}")]
    Network(#[from] reqwest::Error),

    #[error("manifest body was not valid utf-8: {0}")]
    InvalidManifestEncoding(#[source] std::str::Utf8Error),

    #[error("extraction backend error: {reason}")]
    Extraction { reason: String },

    #[error("no playable streams found for '{url}'")]
    NoStreamsFound { url: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn upstream_status(status: u16, url: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            status,
            url: url.into(),
        }
    }

    /// Whether a fresh attempt at the same operation might succeed.
    ///
    /// Only timeouts are retryable in this pipeline (see retry module) —
    /// everything else (bad status, malformed url, cancellation) is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
            || matches!(self, GatewayError::Network(e) if e.is_timeout())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
