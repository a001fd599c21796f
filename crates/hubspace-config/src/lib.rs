//! Configuration for the Hubspace adapters.
//!
//! Layers built-in defaults, an optional TOML file, and `HUBSPACE_*`
//! environment variables, then translates the result into a
//! `hubspace_core::BridgeConfig` plus login credentials. Command-line
//! values are applied on top by the binaries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hubspace_core::{
    BridgeConfig, Credentials, DEFAULT_POLLING_INTERVAL, DEFAULT_SETTLE_DELAY, Endpoints,
    TransportConfig,
};

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "HUBSPACE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no {field} configured")]
    MissingCredential { field: &'static str },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config ──────────────────────────────────────────────────────────

/// Effective adapter configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub email: Option<String>,

    /// Plaintext in the file is accepted; prefer `HUBSPACE_PASSWORD`.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Seconds between background refreshes; 0 disables polling.
    pub polling_interval: u64,

    /// Seconds to wait after login before loading collections.
    pub settle_delay: u64,

    /// HTTP request timeout in seconds.
    pub timeout: u64,

    pub auth_url: String,
    pub api_url: String,
    pub client_id: String,
}

impl Default for Config {
    fn default() -> Self {
        let endpoints = Endpoints::default();
        Self {
            email: None,
            password: None,
            polling_interval: DEFAULT_POLLING_INTERVAL.as_secs(),
            settle_delay: DEFAULT_SETTLE_DELAY.as_secs(),
            timeout: TransportConfig::default().timeout.as_secs(),
            auth_url: endpoints.token_url.to_string(),
            api_url: endpoints.api_url.to_string(),
            client_id: endpoints.client_id,
        }
    }
}

impl Config {
    /// Build the bridge configuration (endpoints, transport, timings).
    pub fn bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        let endpoints = Endpoints::new(&self.auth_url, &self.api_url, self.client_id.clone())
            .map_err(|e| ConfigError::Validation {
                field: "endpoint URL".into(),
                reason: e.to_string(),
            })?;

        Ok(BridgeConfig {
            endpoints,
            transport: TransportConfig::default().with_timeout(Duration::from_secs(self.timeout)),
            polling_interval: Duration::from_secs(self.polling_interval),
            settle_delay: Duration::from_secs(self.settle_delay),
        })
    }

    /// Resolve login credentials. Both email and password must be set.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let email = self
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .ok_or(ConfigError::MissingCredential { field: "email" })?;
        let password = self
            .password
            .clone()
            .map(SecretString::from)
            .ok_or(ConfigError::MissingCredential { field: "password" })?;
        Ok(Credentials { email, password })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "hubspace", "hubspace").map_or_else(
        || PathBuf::from(".hubspace.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["email", "password"]))
}

/// Load config from `path` (missing files are skipped) and the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config: Config = figment(path).extract()?;

    // Read verbatim: figment would coerce an all-digit password to a number.
    if let Ok(email) = std::env::var("HUBSPACE_EMAIL") {
        config.email = Some(email);
    }
    if let Ok(password) = std::env::var("HUBSPACE_PASSWORD") {
        config.password = Some(password);
    }
    Ok(config)
}
