// ── Command loop ──
//
// Reads one JSON command per line, dispatches it against the bridge, and
// writes exactly one response line per non-blank input line. Handler
// failures become error responses; only output failures end the loop
// early.

use std::io;

use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::bridge::{Bridge, Connector, ResourceController};
use crate::command::{Command, Dialect};
use crate::error::CoreError;
use crate::input::LineSource;
use crate::response::Response;
use crate::shutdown::Shutdown;

/// A command loop speaking one [`Dialect`].
///
/// Classic adapters are built around an already-initialised bridge.
/// Session adapters start empty and create bridges through their
/// connector when a `login` arrives.
pub struct Adapter<C: Connector> {
    dialect: Dialect,
    connector: Option<C>,
    bridge: Option<C::Bridge>,
    shutdown: Shutdown,
}

impl<C: Connector> Adapter<C> {
    pub fn classic(bridge: C::Bridge, shutdown: Shutdown) -> Self {
        Self {
            dialect: Dialect::Classic,
            connector: None,
            bridge: Some(bridge),
            shutdown,
        }
    }

    pub fn session(connector: C, shutdown: Shutdown) -> Self {
        Self {
            dialect: Dialect::Session,
            connector: Some(connector),
            bridge: None,
            shutdown,
        }
    }

    /// The active bridge, if any.
    pub fn bridge(&self) -> Option<&C::Bridge> {
        self.bridge.as_ref()
    }

    /// Serve commands until end of input, `close`, or a shutdown signal,
    /// then close the bridge.
    ///
    /// The classic dialect reports teardown with a final `{"closed": true}`.
    pub async fn run<L, W>(&mut self, input: &mut L, output: &mut W) -> Result<(), CoreError>
    where
        L: LineSource,
        W: AsyncWrite + Unpin + Send,
    {
        let served = self.serve(input, output).await;
        self.close_bridge().await;
        served?;

        if self.dialect == Dialect::Classic {
            write_line(output, &Response::Closed).await?;
        }
        Ok(())
    }

    async fn serve<L, W>(&mut self, input: &mut L, output: &mut W) -> Result<(), CoreError>
    where
        L: LineSource,
        W: AsyncWrite + Unpin + Send,
    {
        let shutdown = self.shutdown.clone();

        while !shutdown.is_triggered() {
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                next = input.next_line() => next,
            };

            let response = match next {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => self.handle_line(&line).await,
                Ok(None) => {
                    debug!("end of input");
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::InvalidData => Response::invalid_json(&e),
                Err(e) => {
                    warn!(error = %e, "input failed, stopping");
                    break;
                }
            };
            write_line(output, &response).await?;
        }
        Ok(())
    }

    /// Handle one raw input line, producing its response.
    pub async fn handle_line(&mut self, line: &str) -> Response {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return Response::invalid_json(&e),
        };

        match self.dispatch(&value).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "command failed");
                Response::failure(self.dialect, &e)
            }
        }
    }

    async fn dispatch(&mut self, value: &Value) -> Result<Response, CoreError> {
        match Command::parse(self.dialect, value)? {
            Command::ListDevices => {
                let bridge = self.require_bridge()?;
                let items = match self.dialect {
                    Dialect::Classic => bridge.switches().items(),
                    Dialect::Session => bridge.devices().items(),
                };
                let summaries = items.iter().map(|d| d.summary()).collect();
                Ok(Response::devices(self.dialect, summaries))
            }
            Command::SetPower { device_id, power } => {
                let bridge = self.require_bridge()?;
                let device = bridge
                    .devices()
                    .get(&device_id)
                    .ok_or(CoreError::DeviceNotFound {
                        identifier: device_id,
                    })?;
                let controller = match self.dialect {
                    Dialect::Classic => bridge.switches(),
                    Dialect::Session => bridge.devices(),
                };
                controller.set_state(&device.id, power.is_on()).await?;
                Ok(Response::Ok)
            }
            Command::Login {
                credentials,
                polling_interval,
            } => {
                let Some(connector) = &self.connector else {
                    return Err(CoreError::InvalidCommand {
                        message: "login is not available on this adapter".into(),
                    });
                };
                if let Some(previous) = self.bridge.take() {
                    debug!("replacing existing session");
                    previous.close().await;
                }
                self.bridge = Some(connector.connect(credentials, polling_interval).await?);
                info!("logged in");
                Ok(Response::Ok)
            }
            Command::Close => {
                self.shutdown.trigger();
                Ok(Response::Closing)
            }
            Command::Unknown(name) => Ok(Response::unknown_command(self.dialect, &name)),
        }
    }

    fn require_bridge(&self) -> Result<&C::Bridge, CoreError> {
        self.bridge.as_ref().ok_or(CoreError::NotLoggedIn)
    }

    async fn close_bridge(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            bridge.close().await;
        }
    }
}

/// Serialise a response as one line and flush it.
async fn write_line<W>(output: &mut W, response: &Response) -> Result<(), CoreError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await?;
    Ok(())
}
