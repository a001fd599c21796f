// Afero cloud JSON shapes.
//
// Only the fields the adapter reads are modelled; everything else in the
// metadevice payload is ignored by serde.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `typeId` of metadevices that represent a physical device.
pub const DEVICE_TYPE_ID: &str = "metadevice.device";

/// A metadevice as returned by `GET /v1/accounts/{id}/metadevices`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadevice {
    pub id: String,
    #[serde(default)]
    pub type_id: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub state: MetadeviceState,
}

impl Metadevice {
    /// `true` for physical devices (as opposed to rooms, homes, etc.).
    pub fn is_device(&self) -> bool {
        self.type_id == DEVICE_TYPE_ID
    }

    /// Current value of a function, matched on class and instance.
    pub fn function_value(&self, class: &str, instance: Option<&str>) -> Option<&Value> {
        self.state
            .values
            .iter()
            .find(|f| f.function_class == class && f.function_instance.as_deref() == instance)
            .map(|f| &f.value)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    #[serde(default)]
    pub device: DeviceDescription,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    #[serde(default)]
    pub default_name: String,
    #[serde(default)]
    pub device_class: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadeviceState {
    #[serde(default)]
    pub values: Vec<FunctionState>,
}

/// One function value, used both when reading state and writing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionState {
    pub function_class: String,
    #[serde(default)]
    pub function_instance: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<i64>,
}

/// Body of `PUT /v1/accounts/{id}/metadevices/{id}/state`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateUpdate<'a> {
    pub metadevice_id: &'a str,
    pub values: &'a [FunctionState],
}

// ── Account / auth responses ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserInfo {
    #[serde(default)]
    pub account_access: Vec<AccountAccess>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountAccess {
    pub account: Account,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Account {
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    120
}
