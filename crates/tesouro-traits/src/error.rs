//! Error types for source operations.

use thiserror::Error;

/// Failure of a single fetch or parse step.
///
/// Every variant is soft from the service's point of view: the acquirer logs
/// it, skips the cycle and keeps serving the previously published snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request never produced a response (DNS, TLS, connect, timeout)
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Upstream answered with a non-success status code
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body could not be read
    #[error("failed to read response body: {0}")]
    BodyRead(String),

    /// Document could not be decoded (malformed JSON or delimited record)
    #[error("parse error: {0}")]
    ParseError(String),

    /// A monetary column held a value that is not a non-negative amount
    #[error("invalid price format: {0}")]
    InvalidAmount(String),

    /// Raw payload shape does not match the source that received it
    #[error("unexpected dataset: {0}")]
    UnexpectedDataset(String),
}

impl SourceError {
    /// Returns true for failures raised while talking to upstream, as opposed
    /// to failures decoding what upstream sent.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SourceError::ConnectionFailed(_)
                | SourceError::UnexpectedStatus { .. }
                | SourceError::BodyRead(_)
        )
    }
}
