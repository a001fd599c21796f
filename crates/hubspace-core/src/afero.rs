// ── Afero-backed bridge ──
//
// Implements the bridge traits against the Afero cloud: logs in,
// loads the device listing into the DeviceStore, and keeps it fresh with
// a background refresh task until the bridge is closed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hubspace_api::{AferoClient, Credentials, FunctionState};

use crate::bridge::{Bridge, Connector, ResourceController};
use crate::config::BridgeConfig;
use crate::error::CoreError;
use crate::model::{Device, PowerState};
use crate::store::{DeviceStore, Scope};

/// State shared by the bridge, both controllers, and the refresh task.
struct Session {
    client: AferoClient,
    credentials: Credentials,
    account_id: OnceCell<String>,
    store: DeviceStore,
}

impl Session {
    async fn account(&self) -> Result<&str, CoreError> {
        let id = self
            .account_id
            .get_or_try_init(|| self.client.account_id())
            .await?;
        Ok(id.as_str())
    }

    /// Fetch the physical devices on the account.
    async fn fetch(&self) -> Result<Vec<Device>, CoreError> {
        let account = self.account().await?;
        let metadevices = self.client.list_metadevices(account).await?;
        Ok(metadevices
            .iter()
            .filter(|m| m.is_device())
            .map(Device::from)
            .collect())
    }

    async fn refresh(&self) -> Result<usize, CoreError> {
        let devices = self.fetch().await?;
        self.store.apply_all(&devices);
        Ok(devices.len())
    }
}

// ── Controller ───────────────────────────────────────────────────

/// One scope of the device store, backed by the cloud session.
pub struct AferoController {
    scope: Scope,
    session: Arc<Session>,
}

impl ResourceController for AferoController {
    fn items(&self) -> Vec<Arc<Device>> {
        self.session.store.items(self.scope).to_vec()
    }

    fn get(&self, id: &str) -> Option<Arc<Device>> {
        self.session.store.get(self.scope, id)
    }

    async fn initialize(&self) -> Result<(), CoreError> {
        let devices = self.session.fetch().await?;
        self.session.store.apply_snapshot(self.scope, &devices);
        debug!(
            scope = ?self.scope,
            count = self.session.store.len(self.scope),
            "collection initialized"
        );
        Ok(())
    }

    async fn set_state(&self, id: &str, on: bool) -> Result<(), CoreError> {
        if self.get(id).is_none() {
            return Err(CoreError::DeviceNotFound {
                identifier: id.to_owned(),
            });
        }

        let power = PowerState::from_bool(on);
        let account = self.session.account().await?;
        let values = [FunctionState {
            function_class: "power".into(),
            function_instance: None,
            value: Value::String(power.to_string()),
            last_update_time: None,
        }];
        self.session.client.set_state(account, id, &values).await?;
        self.session.store.apply_power(id, power);

        info!(device = id, %power, "power state set");
        Ok(())
    }
}

// ── Bridge ───────────────────────────────────────────────────────

/// A logged-in Afero session with device and switch collections.
///
/// Dropping the bridge stops its refresh task; [`close`](Bridge::close)
/// additionally waits for the task and clears the session token.
pub struct AferoBridge {
    session: Arc<Session>,
    devices: AferoController,
    switches: AferoController,
    polling_interval: Duration,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AferoBridge {
    /// Build a bridge. Does NOT log in -- call
    /// [`initialize()`](Bridge::initialize) for that.
    pub fn new(config: &BridgeConfig, credentials: Credentials) -> Result<Self, CoreError> {
        let client = AferoClient::new(config.endpoints.clone(), &config.transport)?;
        Ok(Self::with_client(client, credentials, config.polling_interval))
    }

    /// Build a bridge around an existing client.
    pub fn with_client(
        client: AferoClient,
        credentials: Credentials,
        polling_interval: Duration,
    ) -> Self {
        let session = Arc::new(Session {
            client,
            credentials,
            account_id: OnceCell::new(),
            store: DeviceStore::new(),
        });
        Self {
            devices: AferoController {
                scope: Scope::Devices,
                session: Arc::clone(&session),
            },
            switches: AferoController {
                scope: Scope::Switches,
                session: Arc::clone(&session),
            },
            session,
            polling_interval,
            cancel: CancellationToken::new(),
            task_handles: Mutex::new(Vec::new()),
        }
    }

    /// The underlying device store.
    pub fn store(&self) -> &DeviceStore {
        &self.session.store
    }

    async fn spawn_refresh(&self) {
        if self.polling_interval.is_zero() {
            return;
        }
        let mut handles = self.task_handles.lock().await;
        if !handles.is_empty() {
            return;
        }
        handles.push(tokio::spawn(refresh_task(
            Arc::clone(&self.session),
            self.polling_interval,
            self.cancel.clone(),
        )));
        debug!(interval = ?self.polling_interval, "refresh task spawned");
    }
}

impl Bridge for AferoBridge {
    type Controller = AferoController;

    async fn initialize(&self) -> Result<(), CoreError> {
        self.session
            .client
            .login(&self.session.credentials)
            .await?;
        let count = self.session.refresh().await?;
        info!(devices = count, "bridge initialized");
        self.spawn_refresh().await;
        Ok(())
    }

    fn devices(&self) -> &AferoController {
        &self.devices
    }

    fn switches(&self) -> &AferoController {
        &self.switches
    }

    async fn close(&self) {
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.task_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        self.session.client.logout().await;
        debug!("bridge closed");
    }
}

impl Drop for AferoBridge {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Periodically re-fetch the device listing until cancelled.
async fn refresh_task(session: Arc<Session>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match session.refresh().await {
                    Ok(count) => debug!(devices = count, "periodic refresh"),
                    Err(e) => warn!(error = %e, "periodic refresh failed"),
                }
            }
        }
    }
    debug!("refresh task stopped");
}

// ── Connector ────────────────────────────────────────────────────

/// Builds and initialises [`AferoBridge`]s for the `login` command.
#[derive(Debug, Clone, Default)]
pub struct AferoConnector {
    config: BridgeConfig,
}

impl AferoConnector {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Build an uninitialised bridge, optionally overriding the polling
    /// interval.
    pub fn bridge(
        &self,
        credentials: Credentials,
        polling_interval: Option<Duration>,
    ) -> Result<AferoBridge, CoreError> {
        let config = match polling_interval {
            Some(interval) => self.config.clone().with_polling_interval(interval),
            None => self.config.clone(),
        };
        AferoBridge::new(&config, credentials)
    }
}

impl Connector for AferoConnector {
    type Bridge = AferoBridge;

    async fn connect(
        &self,
        credentials: Credentials,
        polling_interval: Option<Duration>,
    ) -> Result<AferoBridge, CoreError> {
        let bridge = self.bridge(credentials, polling_interval)?;
        bridge.initialize().await?;
        Ok(bridge)
    }
}
