//! The Hubspace adapter binaries and the host that drives them.
//!
//! - `hubspace-cli` logs in from its arguments and serves switch commands.
//! - `hubspace-session` waits for a `login` command before serving.
//! - [`host::AdapterHost`] spawns either binary and speaks the protocol
//!   from the other side of the pipe.

pub mod app;
pub mod cli;
pub mod error;
pub mod host;
pub mod logging;

pub use error::{CliError, exit_code};
pub use host::{AdapterHost, HostError};
