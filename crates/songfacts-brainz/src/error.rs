//! Error types for the MusicBrainz and AcousticBrainz clients.

use thiserror::Error;

/// Errors that can occur when talking to MusicBrainz or AcousticBrainz.
#[derive(Debug, Error)]
pub enum BrainzError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// HTTP request failed (connection, timeout or body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The response was well-formed JSON but not the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BrainzError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BrainzError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            BrainzError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}
