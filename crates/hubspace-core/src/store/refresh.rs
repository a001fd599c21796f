// ── Refresh application logic ──
//
// Applies cloud listings and local state writes to the DeviceStore.

use super::{DeviceStore, Scope};
use crate::model::{Device, PowerState};

impl DeviceStore {
    /// Apply a full listing to one scope.
    ///
    /// Uses upsert-then-prune: devices missing from the listing are
    /// removed, devices outside the scope are ignored.
    pub fn apply_snapshot(&self, scope: Scope, devices: &[Device]) {
        let items = devices
            .iter()
            .filter(|d| scope.admits(d))
            .map(|d| (d.id.clone(), d.clone()))
            .collect();
        self.collection(scope).upsert_and_prune(items);
    }

    /// Apply a full listing to every scope.
    pub fn apply_all(&self, devices: &[Device]) {
        self.apply_snapshot(Scope::Devices, devices);
        self.apply_snapshot(Scope::Switches, devices);
    }

    /// Record a power change that was accepted by the cloud.
    ///
    /// Returns `true` if at least one scope held the device.
    pub fn apply_power(&self, id: &str, power: PowerState) -> bool {
        let set = |d: &Device| Device {
            power: Some(power),
            ..d.clone()
        };
        let in_devices = self.devices.update(id, set);
        let in_switches = self.switches.update(id, set);
        in_devices || in_switches
    }
}
