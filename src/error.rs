use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Credential exchange rejected by the backend. Displays the backend message verbatim.
    #[error("{message}")]
    Authentication {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// An authenticated call came back 401/403; the session has been logged out.
    #[error("Session expired")]
    SessionExpired { status: u16 },

    /// No authenticated session to attach to the call.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("External identity provider unavailable")]
    IdentityProviderUnavailable,
}

impl Error {
    /// Wraps a reqwest failure, separating timeouts from other transport errors.
    pub(crate) fn transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Http(err)
        }
    }

    /// True when the backend could not be reached (as opposed to rejecting the call).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout(_))
    }

    /// True when the backend declared the session invalid.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// HTTP status attached to the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. }
            | Self::SessionExpired { status }
            | Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
