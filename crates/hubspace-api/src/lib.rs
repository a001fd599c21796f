//! Async client for the Afero cloud API that backs Hubspace devices.
//!
//! Deliberately thin: a bearer-token login, the account lookup, the
//! metadevice listing, and function-state writes. Everything above that
//! (collections, polling, the NDJSON command loop) lives in `hubspace-core`.
//!
//! - **[`AferoClient`]**: HTTP client holding the session token.
//! - **[`Endpoints`]**: token / API base URLs and the OAuth client id.
//! - **[`TransportConfig`]**: shared `reqwest::Client` construction.
//! - **[`models`]**: serde types for the metadevice JSON shapes.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{Credentials, Endpoints};
pub use client::AferoClient;
pub use error::Error;
pub use models::{FunctionState, Metadevice};
pub use transport::TransportConfig;
