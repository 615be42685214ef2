//! Errors returned by the backend client.

use thiserror::Error;

/// Failure of a single backend request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No base URL was configured (settings, environment or CLI flag).
    #[error("API base URL is not configured (set POCO_BACKEND_URL or BACKEND_URL)")]
    MissingBaseUrl,
    /// The request did not complete within the configured timeout.
    #[error("request timeout: {endpoint}")]
    Timeout {
        /// Endpoint path that timed out.
        endpoint: String,
    },
    /// Connection or protocol level failure.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path that failed.
        endpoint: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success HTTP status.
    #[error("API error {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error payload, or the canonical reason.
        message: String,
    },
    /// The `{ code, message, data }` envelope carried a failure code.
    #[error("API error code {code}: {message}")]
    Envelope {
        /// Envelope code (anything other than 0 or 200).
        code: i64,
        /// Envelope message.
        message: String,
    },
    /// The response body did not match the expected shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path whose body failed to decode.
        endpoint: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Returns the HTTP-like status associated with this error, if any.
    ///
    /// Timeouts report 408 so callers can treat them like the backend's
    /// own timeout responses.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Timeout { .. } => Some(408),
            Self::Status { status, .. } => Some(*status),
            Self::MissingBaseUrl
            | Self::Transport { .. }
            | Self::Envelope { .. }
            | Self::Decode { .. } => None,
        }
    }
}
