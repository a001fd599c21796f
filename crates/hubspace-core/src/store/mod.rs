// ── Device store ──
//
// Two views over the same cloud listing: every physical device, and the
// subset driven through the switch collection. Both are refreshed from
// one snapshot so they never disagree about a device's state.

mod collection;
mod refresh;

use std::sync::Arc;

use tokio::sync::watch;

use crate::model::{Device, DeviceKind};
use collection::EntityCollection;

/// Which view of the store a controller reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Devices,
    Switches,
}

impl Scope {
    pub fn admits(self, device: &Device) -> bool {
        match self {
            Self::Devices => true,
            Self::Switches => device.kind() == DeviceKind::Switch,
        }
    }
}

/// Shared device state, written by refreshes and state writes.
pub struct DeviceStore {
    devices: EntityCollection<Device>,
    switches: EntityCollection<Device>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        Self {
            devices: EntityCollection::new(),
            switches: EntityCollection::new(),
        }
    }

    fn collection(&self, scope: Scope) -> &EntityCollection<Device> {
        match scope {
            Scope::Devices => &self.devices,
            Scope::Switches => &self.switches,
        }
    }

    /// Current devices in a scope, ordered by id.
    pub fn items(&self, scope: Scope) -> Arc<Vec<Arc<Device>>> {
        self.collection(scope).snapshot()
    }

    pub fn get(&self, scope: Scope, id: &str) -> Option<Arc<Device>> {
        self.collection(scope).get(id)
    }

    pub fn len(&self, scope: Scope) -> usize {
        self.collection(scope).len()
    }

    pub fn is_empty(&self, scope: Scope) -> bool {
        self.len(scope) == 0
    }

    /// Subscribe to snapshot changes for a scope.
    pub fn subscribe(&self, scope: Scope) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.collection(scope).subscribe()
    }
}
