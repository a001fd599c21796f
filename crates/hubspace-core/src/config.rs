// ── Runtime bridge configuration ──
//
// Describes *how* to reach the device service and how often to poll it.
// Carries no credentials and never touches disk; the binaries construct a
// `BridgeConfig` from flags, environment, and the config file.

use std::time::Duration;

use hubspace_api::{Endpoints, TransportConfig};

pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub endpoints: Endpoints,
    pub transport: TransportConfig,
    /// Background refresh period; zero disables polling.
    pub polling_interval: Duration,
    /// Pause between session setup and the explicit collection loads.
    pub settle_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            transport: TransportConfig::default(),
            polling_interval: DEFAULT_POLLING_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl BridgeConfig {
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }
}
