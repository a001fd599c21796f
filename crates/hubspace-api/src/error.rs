use thiserror::Error;

/// Top-level error type for the `hubspace-api` crate.
///
/// Covers authentication, transport, and response-shape failures.
/// `hubspace-core` maps these into the messages the adapter reports.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token request rejected (wrong credentials, locked account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Token expired and could not be renewed.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success status from the Afero API.
    #[error("Afero API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The authenticated user has no account to list devices from.
    #[error("No Hubspace account is associated with this login")]
    NoAccount,

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}
