//! Error types for the recorder client.
//!
//! # Design
//! Failures are grouped the way a caller reacts to them: a bad base URL is a
//! configuration problem, transport failures (including cancellation and an
//! expired deadline) are worth retrying by the caller, and decode failures
//! mean the server answered with something other than the expected envelope.
//! Nothing is retried or swallowed inside the client.

use chrono::{DateTime, Utc};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The base URL, or the URL built from it, could not be parsed.
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    /// Connection failure, I/O error or transport-level timeout.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// The response body is not valid JSON or does not match the envelope.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// A query bound derived from this instant falls outside chrono's range.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(DateTime<Utc>),
}

impl ApiError {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ApiError::Transport(err.into())
    }

    /// True for failures of the round-trip itself rather than of its content.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_) | ApiError::Cancelled | ApiError::DeadlineExceeded
        )
    }
}
