//! Error taxonomy.
//!
//! | Type | Meaning | Surfaces as |
//! |------|---------|-------------|
//! | [`ValidationError`] | malformed top-level input | request fails before any provider call |
//! | [`ProbeFailure`] | one provider timed out, failed, or was not configured | `found: null` for that provider only |
//! | [`SearchError`] | the aggregate itself failed | single top-level error |
//!
//! An explicit provider "not found" is not an error at all; it is a normal
//! `found: false` outcome produced by the normalizer.

use std::time::Duration;
use thiserror::Error;

use crate::models::SearchKind;

/// Malformed input detected by the identifier classifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} query must not be empty")]
    EmptyQuery(SearchKind),

    #[error("{0} search does not accept binary input")]
    BinaryNotSupported(SearchKind),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("image data is not valid base64")]
    InvalidImageEncoding,

    #[error("unsupported image content type: {0}")]
    UnsupportedImageType(String),

    #[error("Image too large ({size} bytes, max {max})")]
    ImageTooLarge { size: usize, max: usize },
}

/// Why a single probe produced no usable response.
///
/// Every variant degrades to `found: null`; none of them propagate past
/// the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("API key not configured")]
    MissingCredential,
}

impl From<reqwest::Error> for ProbeFailure {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs can carry API keys in their query string.
        ProbeFailure::Transport(err.without_url().to_string())
    }
}

/// Top-level failure of one aggregate call.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unexpected fault outside any provider. Served as HTTP 500.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
