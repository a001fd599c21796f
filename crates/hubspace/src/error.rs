//! Startup error types with miette diagnostics.
//!
//! Only failures before the command loop starts reach here; once serving,
//! errors are reported on stdout as protocol responses.

use miette::Diagnostic;
use thiserror::Error;

use hubspace_config::ConfigError;
use hubspace_core::CoreError;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// Also used for usage errors.
    pub const GENERAL: i32 = 1;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("{message}")]
    #[diagnostic(
        code(hubspace::usage),
        help(
            "Usage: hubspace-cli <email> <password> [polling_interval]\n\
             Email and password may also come from HUBSPACE_EMAIL / HUBSPACE_PASSWORD."
        )
    )]
    Usage { message: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(hubspace::auth_failed),
        help("Check the Hubspace account email and password.")
    )]
    AuthFailed { message: String },

    #[error("Could not reach Hubspace: {reason}")]
    #[diagnostic(
        code(hubspace::connection_failed),
        help("Check network access, or HUBSPACE_AUTH_URL / HUBSPACE_API_URL if overridden.")
    )]
    ConnectionFailed { reason: String },

    #[error(transparent)]
    #[diagnostic(code(hubspace::config))]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(hubspace::core))]
    Core(CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::Io(e) => Self::Io(e),
            other => Self::Core(other),
        }
    }
}
