//! Device layer and NDJSON command loop for the Hubspace adapters.
//!
//! - **[`Adapter`]**: reads one JSON command per line, dispatches it
//!   against a [`Bridge`], and writes one JSON response per line. Two
//!   [`Dialect`]s: *classic* (bridge built from process arguments) and
//!   *session* (bridge built by a `login` command).
//!
//! - **[`Bridge`] / [`ResourceController`] / [`Connector`]**: the seam
//!   between the loop and the device service. [`AferoBridge`] implements it
//!   against the Afero cloud with a background refresh task.
//!
//! - **[`DeviceStore`]**: `DashMap` + `watch` collections holding the
//!   current device listing, refreshed upsert-then-prune.
//!
//! - **[`Shutdown`]**: cancellation shared by the loop, `close`, and the
//!   signal listener.

pub mod adapter;
pub mod afero;
pub mod bridge;
pub mod command;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod response;
pub mod shutdown;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use adapter::Adapter;
pub use afero::{AferoBridge, AferoConnector, AferoController};
pub use bridge::{Bridge, Connector, ResourceController, prepare};
pub use command::{Command, Dialect};
pub use config::{BridgeConfig, DEFAULT_POLLING_INTERVAL, DEFAULT_SETTLE_DELAY};
pub use error::CoreError;
pub use input::{LineSource, ThreadedLines};
pub use model::{Device, DeviceKind, DeviceSummary, PowerState, SummaryState};
pub use response::Response;
pub use shutdown::Shutdown;
pub use store::{DeviceStore, Scope};

pub use hubspace_api::{Credentials, Endpoints, TransportConfig};
