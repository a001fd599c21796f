// ── Device-client seam ──
//
// The command loop only talks to these traits. `AferoBridge` implements
// them against the cloud; tests implement them in memory.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hubspace_api::Credentials;

use crate::error::CoreError;
use crate::model::Device;

/// One device collection (all devices, or switches).
pub trait ResourceController: Send + Sync {
    /// Devices currently known to this collection.
    fn items(&self) -> Vec<Arc<Device>>;

    /// Look up a device by id.
    fn get(&self, id: &str) -> Option<Arc<Device>>;

    /// (Re)load this collection from the backing service.
    fn initialize(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Switch a device on or off.
    fn set_state(&self, id: &str, on: bool) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// A live session with the device service.
pub trait Bridge: Send + Sync {
    type Controller: ResourceController;

    /// Authenticate and load the initial device listing.
    fn initialize(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn devices(&self) -> &Self::Controller;

    fn switches(&self) -> &Self::Controller;

    /// Stop background work and release the session. Safe to call twice.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Creates initialised bridges on demand (the `login` command).
pub trait Connector: Send + Sync {
    type Bridge: Bridge;

    fn connect(
        &self,
        credentials: Credentials,
        polling_interval: Option<Duration>,
    ) -> impl Future<Output = Result<Self::Bridge, CoreError>> + Send;
}

/// Startup sequence for a bridge built from process arguments.
///
/// Initialise the session, give the service time to populate its device
/// listing, then load both collections explicitly.
pub async fn prepare<B: Bridge>(bridge: &B, settle_delay: Duration) -> Result<(), CoreError> {
    bridge.initialize().await?;
    if !settle_delay.is_zero() {
        tokio::time::sleep(settle_delay).await;
    }
    bridge.devices().initialize().await?;
    bridge.switches().initialize().await?;
    Ok(())
}
