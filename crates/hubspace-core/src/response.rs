// ── Response lines ──
//
// Every line the adapter writes is one of these. Error keys differ by
// dialect, so error variants carry the key alongside the message.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::command::Dialect;
use crate::model::DeviceSummary;

pub const SANITY_MESSAGE: &str = "Hubspace CLI is responsive.";

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `{"status": "ok"}`
    Ok,
    /// `{"status": "closing"}`
    Closing,
    /// `{"closed": true}`
    Closed,
    /// `{"status": "ok", "message": "..."}`
    Ready,
    /// Bare array of summaries.
    DeviceArray(Vec<DeviceSummary>),
    /// `{"devices": [...]}`
    Devices(Vec<DeviceSummary>),
    /// `{<key>: <message>}`
    Error { key: &'static str, message: String },
}

impl Response {
    /// Response for a line that is not valid JSON. Both dialects use the
    /// same key.
    pub fn invalid_json(err: &dyn std::fmt::Display) -> Self {
        Self::Error {
            key: "JSON Error",
            message: format!("Invalid JSON: {err}"),
        }
    }

    /// Response for a command name the dialect does not handle.
    pub fn unknown_command(dialect: Dialect, name: &str) -> Self {
        let key = match dialect {
            Dialect::Classic => "Unknown Command Error",
            Dialect::Session => "error",
        };
        Self::Error {
            key,
            message: format!("Unknown command: {name}"),
        }
    }

    /// Response for a command whose handler failed.
    pub fn failure(dialect: Dialect, err: &dyn std::fmt::Display) -> Self {
        let key = match dialect {
            Dialect::Classic => "Unknown Error",
            Dialect::Session => "error",
        };
        Self::Error {
            key,
            message: err.to_string(),
        }
    }

    /// Listing response in the dialect's shape.
    pub fn devices(dialect: Dialect, summaries: Vec<DeviceSummary>) -> Self {
        match dialect {
            Dialect::Classic => Self::DeviceArray(summaries),
            Dialect::Session => Self::Devices(summaries),
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::DeviceArray(items) => items.serialize(serializer),
            Self::Ok => single(serializer, "status", "ok"),
            Self::Closing => single(serializer, "status", "closing"),
            Self::Closed => single(serializer, "closed", &true),
            Self::Devices(items) => single(serializer, "devices", items),
            Self::Error { key, message } => single(serializer, key, message),
            Self::Ready => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("status", "ok")?;
                map.serialize_entry("message", SANITY_MESSAGE)?;
                map.end()
            }
        }
    }
}

fn single<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    key: &str,
    value: &V,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(key, value)?;
    map.end()
}
