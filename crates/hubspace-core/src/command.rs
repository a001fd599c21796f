// ── Command parsing ──
//
// Turns one decoded JSON line into a typed command for the active
// dialect. Command names the dialect does not know become
// `Command::Unknown` rather than an error, so the loop can answer them.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::{Map, Value};

use hubspace_api::Credentials;

use crate::error::CoreError;
use crate::model::PowerState;

/// Which adapter protocol is being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Bridge built from process arguments; array listings, titled error keys.
    Classic,
    /// Bridge built by `login`; wrapped listings, plain `error` key.
    Session,
}

/// A parsed adapter command.
#[derive(Debug)]
pub enum Command {
    ListDevices,
    SetPower {
        device_id: String,
        power: PowerState,
    },
    Login {
        credentials: Credentials,
        polling_interval: Option<Duration>,
    },
    Close,
    Unknown(String),
}

impl Command {
    /// Parse a decoded JSON line.
    ///
    /// Fails only when the value is not an object or a recognised command
    /// lacks a required field.
    pub fn parse(dialect: Dialect, value: &Value) -> Result<Self, CoreError> {
        let fields = value.as_object().ok_or_else(|| CoreError::InvalidCommand {
            message: "expected a JSON object".into(),
        })?;

        let name = match fields.get("command") {
            Some(Value::String(name)) => name.clone(),
            Some(other) => other.to_string(),
            None => Value::Null.to_string(),
        };

        let command = match (dialect, name.as_str()) {
            (Dialect::Classic, "list_devices") | (Dialect::Session, "get_devices" | "list_devices") => {
                Self::ListDevices
            }
            (Dialect::Classic, "set_switch") => Self::SetPower {
                device_id: device_id(fields)?,
                power: PowerState::from_switch_value(fields.get("state")),
            },
            (Dialect::Session, "set_device_state") => {
                let state = fields
                    .get("state")
                    .ok_or(CoreError::MissingField { field: "state" })?;
                Self::SetPower {
                    device_id: device_id(fields)?,
                    power: PowerState::from_state_value(state)?,
                }
            }
            (Dialect::Session, "login") => Self::Login {
                credentials: Credentials {
                    email: required_str(fields, "email")?,
                    password: SecretString::from(required_str(fields, "password")?),
                },
                polling_interval: polling_interval(fields)?,
            },
            (_, "close") => Self::Close,
            _ => Self::Unknown(name),
        };
        Ok(command)
    }
}

fn required_str(fields: &Map<String, Value>, field: &'static str) -> Result<String, CoreError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(CoreError::MissingField { field }),
        Some(other) => Err(CoreError::InvalidCommand {
            message: format!("'{field}' must be a string, got {other}"),
        }),
    }
}

/// Device ids are strings, but numeric ids are accepted verbatim.
fn device_id(fields: &Map<String, Value>) -> Result<String, CoreError> {
    match fields.get("device_id") {
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => required_str(fields, "device_id"),
    }
}

fn polling_interval(fields: &Map<String, Value>) -> Result<Option<Duration>, CoreError> {
    match fields.get("polling_interval") {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| CoreError::InvalidCommand {
                message: format!("'polling_interval' must be a non-negative integer, got {value}"),
            }),
    }
}
