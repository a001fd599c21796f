// ── Device domain types ──

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use hubspace_api::Metadevice;

use crate::error::CoreError;

/// Device classes driven through the switch collection.
const SWITCH_CLASSES: &[&str] = &["switch", "power-outlet", "landscape-transformer"];

/// Coarse device grouping used to decide collection membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Switch,
    Other,
}

impl DeviceKind {
    pub fn from_class(device_class: &str) -> Self {
        if SWITCH_CLASSES.contains(&device_class) {
            Self::Switch
        } else {
            Self::Other
        }
    }
}

/// Binary power state, as stored by the cloud (`"on"` / `"off"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    /// Strict `set_switch` mapping: exactly `"on"` is on, anything else
    /// (including a missing value) is off.
    pub fn from_switch_value(value: Option<&Value>) -> Self {
        Self::from_bool(value.and_then(Value::as_str) == Some("on"))
    }

    /// Lenient `set_device_state` mapping.
    ///
    /// Accepts `"on"`/`"off"` in any case, JSON booleans, and objects of
    /// the form `{"power": <any of the above>}`.
    pub fn from_state_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Bool(on) => Ok(Self::from_bool(*on)),
            Value::String(s) => s.parse().map_err(|_| CoreError::InvalidCommand {
                message: format!("unsupported power state '{s}'"),
            }),
            Value::Object(map) => map.get("power").map_or(
                Err(CoreError::MissingField { field: "state.power" }),
                Self::from_state_value,
            ),
            other => Err(CoreError::InvalidCommand {
                message: format!("unsupported state {other}"),
            }),
        }
    }

    /// Parse the cloud's stored function value.
    fn from_function_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| s.parse().ok())
    }
}

/// Canonical device, converted from an Afero metadevice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Metadevice id; used for lookups and state writes.
    pub id: String,
    pub default_name: String,
    pub name: String,
    pub device_class: String,
    /// Default-instance `power` function, if the device has one.
    pub power: Option<PowerState>,
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        DeviceKind::from_class(&self.device_class)
    }

    /// The adapter's read-only projection of this device.
    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            id: self.id.clone(),
            device_id: self.id.clone(),
            default_name: self.default_name.clone(),
            name: self.name.clone(),
            device_type: self.device_class.clone(),
            state: SummaryState {
                power: self.power.map(PowerState::is_on),
            },
        }
    }
}

impl From<&Metadevice> for Device {
    fn from(meta: &Metadevice) -> Self {
        Self {
            id: meta.id.clone(),
            default_name: meta.description.device.default_name.clone(),
            name: meta.friendly_name.clone(),
            device_class: meta.description.device.device_class.clone(),
            power: meta
                .function_value("power", None)
                .and_then(PowerState::from_function_value),
        }
    }
}

/// One entry of a device listing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: String,
    pub device_id: String,
    pub default_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub state: SummaryState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryState {
    pub power: Option<bool>,
}
