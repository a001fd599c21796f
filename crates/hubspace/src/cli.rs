//! Clap derive structures for the two adapter binaries.

use std::path::PathBuf;

use clap::{Args, Parser};

use hubspace_config::{Config, ConfigError, config_path, load_config_from};

// ── Classic adapter ──────────────────────────────────────────────────

/// hubspace-cli -- Hubspace switch adapter speaking NDJSON on stdin/stdout
#[derive(Debug, Parser)]
#[command(
    name = "hubspace-cli",
    version,
    about = "Log in to Hubspace and serve switch commands as NDJSON on stdin/stdout"
)]
pub struct ClassicArgs {
    /// Hubspace account email
    pub email: Option<String>,

    /// Hubspace account password
    pub password: Option<String>,

    /// Seconds between background device refreshes
    pub polling_interval: Option<u64>,

    /// Print a readiness line and exit without contacting Hubspace
    #[arg(long)]
    pub sanity_check: bool,

    #[command(flatten)]
    pub common: CommonOpts,
}

// ── Session adapter ──────────────────────────────────────────────────

/// hubspace-session -- login-driven Hubspace adapter speaking NDJSON
#[derive(Debug, Parser)]
#[command(
    name = "hubspace-session",
    version,
    about = "Serve Hubspace device commands as NDJSON; log in with a `login` command"
)]
pub struct SessionArgs {
    /// Print a readiness line and exit without contacting Hubspace
    #[arg(long)]
    pub sanity_check: bool,

    #[command(flatten)]
    pub common: CommonOpts,
}

// ── Shared options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CommonOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "HUBSPACE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds to wait after login before loading device collections
    #[arg(long, value_name = "SECS", hide = true)]
    pub settle_delay: Option<u64>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Emit stderr logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl CommonOpts {
    /// Load file + environment config, then apply flag overrides.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let path = self.config.clone().unwrap_or_else(config_path);
        let mut config = load_config_from(&path)?;
        if let Some(delay) = self.settle_delay {
            config.settle_delay = delay;
        }
        Ok(config)
    }
}

impl ClassicArgs {
    /// Effective config: positionals win over environment and file.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = self.common.load_config()?;
        if let Some(email) = &self.email {
            config.email = Some(email.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(interval) = self.polling_interval {
            config.polling_interval = interval;
        }
        Ok(config)
    }
}
