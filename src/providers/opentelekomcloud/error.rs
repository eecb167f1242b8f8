use thiserror::Error;

/// Open Telekom Cloud API errors.
///
/// SECURITY: Error messages must NEVER contain the auth token.
#[derive(Debug, Error)]
pub enum OtcError {
    /// Authentication failed (invalid or expired token, missing permission)
    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network-level error (connection failed, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("failed to decode {what}: {message}")]
    Decode { what: String, message: String },
}

impl OtcError {
    pub fn status(&self) -> Option<u16> {
        match self {
            OtcError::Auth { status, .. } | OtcError::Api { status, .. } => Some(*status),
            OtcError::Network(e) => e.status().map(|s| s.as_u16()),
            OtcError::Decode { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Conflicts, throttling and transient server errors are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status(), Some(409 | 429 | 500 | 502 | 503 | 504))
    }
}
