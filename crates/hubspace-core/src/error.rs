// ── Core error types ──
//
// Errors raised while handling a command. Their `Display` text is what the
// adapter writes back in runtime-error responses, so messages stay short
// and free of HTTP detail. The `From<hubspace_api::Error>` impl translates
// transport-layer errors into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("not logged in")]
    NotLoggedIn,

    #[error("Cannot reach Hubspace: {reason}")]
    ConnectionFailed { reason: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid command: {message}")]
    InvalidCommand { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    // ── Output ───────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<hubspace_api::Error> for CoreError {
    fn from(err: hubspace_api::Error) -> Self {
        match err {
            hubspace_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            hubspace_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "session expired".into(),
            },
            hubspace_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                CoreError::ConnectionFailed {
                    reason: err.to_string(),
                }
            }
            hubspace_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            other => CoreError::Api {
                message: other.to_string(),
                status: None,
            },
        }
    }
}
