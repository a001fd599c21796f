//! Drive an adapter binary from the other end of its pipes.
//!
//! [`AdapterHost`] spawns the adapter with piped stdio, writes one JSON
//! command per line, and matches response lines to requests in FIFO order.
//! The adapter's stderr is forwarded to `tracing`.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hubspace_core::DeviceSummary;

/// How long [`AdapterHost::send`] waits for a response by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the adapter gets to exit after `close` before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to start adapter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("adapter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?} waiting for the adapter")]
    Timeout(Duration),

    #[error("adapter exited before responding")]
    Exited,

    #[error("sanity check failed, adapter printed: {output}")]
    SanityCheck { output: String },

    #[error("adapter rejected {command}: {message}")]
    Rejected {
        command: &'static str,
        message: String,
    },

    #[error("unexpected response to {command}: {response}")]
    Protocol {
        command: &'static str,
        response: Value,
    },
}

/// Requests awaiting a response, oldest first.
#[derive(Default)]
struct Waiters {
    queue: VecDeque<oneshot::Sender<Value>>,
    closed: bool,
}

type Pending = Arc<Mutex<Waiters>>;

/// A running adapter process.
pub struct AdapterHost {
    child: Child,
    stdin: AsyncMutex<ChildStdin>,
    pending: Pending,
    tasks: Vec<JoinHandle<()>>,
    timeout: Duration,
}

impl AdapterHost {
    /// Run `program --sanity-check` and require a `"status": "ok"` line.
    ///
    /// Returns the adapter's readiness message.
    pub async fn verify(program: &Path) -> Result<String, HostError> {
        let output = Command::new(program)
            .arg("--sanity-check")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| HostError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = stdout
            .lines()
            .next()
            .and_then(|line| serde_json::from_str::<Value>(line).ok());

        match reply {
            Some(reply) if output.status.success() && reply["status"] == "ok" => {
                let message = reply["message"].as_str().unwrap_or_default().to_owned();
                info!(%message, "adapter sanity check passed");
                Ok(message)
            }
            _ => Err(HostError::SanityCheck {
                output: stdout.trim().to_owned(),
            }),
        }
    }

    /// Spawn `program` with `args`.
    pub fn spawn<I, S>(program: &Path, args: I) -> Result<Self, HostError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        Self::spawn_command(command)
    }

    /// Spawn a prepared command. Its stdio is replaced with pipes.
    pub fn spawn_command(mut command: Command) -> Result<Self, HostError> {
        let program = command.as_std().get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(HostError::Exited);
        };

        let pending = Pending::default();
        let tasks = vec![
            tokio::spawn(read_responses(stdout, Arc::clone(&pending))),
            tokio::spawn(forward_stderr(stderr)),
        ];
        debug!(%program, pid = ?child.id(), "adapter started");

        Ok(Self {
            child,
            stdin: AsyncMutex::new(stdin),
            pending,
            tasks,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the per-request response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write one command and wait for its response line.
    pub async fn send(&self, payload: &Value) -> Result<Value, HostError> {
        let mut line = serde_json::to_vec(payload).map_err(std::io::Error::other)?;
        line.push(b'\n');

        let (tx, rx) = oneshot::channel();
        {
            // Holding stdin keeps queue order equal to write order.
            let mut stdin = self.stdin.lock().await;
            {
                let mut waiters = lock(&self.pending);
                if waiters.closed {
                    return Err(HostError::Exited);
                }
                waiters.queue.push_back(tx);
            }
            let written = async {
                stdin.write_all(&line).await?;
                stdin.flush().await
            }
            .await;
            if let Err(e) = written {
                lock(&self.pending).queue.pop_back();
                return Err(e.into());
            }
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(HostError::Exited),
            Err(_) => Err(HostError::Timeout(self.timeout)),
        }
    }

    /// Open a session in a session-dialect adapter.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
        polling_interval: Option<u64>,
    ) -> Result<(), HostError> {
        let mut payload = json!({
            "command": "login",
            "email": email,
            "password": password.expose_secret(),
        });
        if let Some(secs) = polling_interval {
            payload["polling_interval"] = json!(secs);
        }

        expect_ok("login", self.send(&payload).await?)?;
        info!("adapter login succeeded");
        Ok(())
    }

    /// List devices. Accepts both the bare-array and `{"devices": [...]}`
    /// response shapes.
    pub async fn get_devices(&self) -> Result<Vec<DeviceSummary>, HostError> {
        let response = self.send(&json!({ "command": "list_devices" })).await?;
        let devices = match response {
            Value::Array(_) => response,
            Value::Object(mut map) if map.contains_key("devices") => {
                map.remove("devices").unwrap_or_default()
            }
            other => return Err(rejection("list_devices", other)),
        };
        serde_json::from_value(devices.clone()).map_err(|_| HostError::Protocol {
            command: "list_devices",
            response: devices,
        })
    }

    /// Set a device's power state, e.g. `json!({"power": "on"})`.
    pub async fn set_device_state(&self, device_id: &str, state: Value) -> Result<(), HostError> {
        let payload = json!({
            "command": "set_device_state",
            "device_id": device_id,
            "state": state,
        });
        expect_ok("set_device_state", self.send(&payload).await?)
    }

    /// Ask the adapter to close, then make sure it is gone.
    pub async fn shutdown(self) {
        info!("stopping adapter");
        match self.send(&json!({ "command": "close" })).await {
            Ok(response) => debug!(%response, "close acknowledged"),
            Err(e) => debug!(error = %e, "close not acknowledged"),
        }

        let Self {
            mut child,
            stdin,
            tasks,
            ..
        } = self;
        drop(stdin);

        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "adapter exited"),
            Ok(Err(e)) => warn!(error = %e, "cannot wait for adapter"),
            Err(_) => {
                warn!("adapter did not exit, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "cannot kill adapter");
                }
            }
        }

        for task in tasks {
            let _ = task.await;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn expect_ok(command: &'static str, response: Value) -> Result<(), HostError> {
    if response.get("status").and_then(Value::as_str) == Some("ok") {
        Ok(())
    } else {
        Err(rejection(command, response))
    }
}

/// Error responses are single-key objects with a string message.
fn rejection(command: &'static str, response: Value) -> HostError {
    let message = response
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.values().next())
        .and_then(Value::as_str)
        .map(str::to_owned);

    match message {
        Some(message) => HostError::Rejected { command, message },
        None => HostError::Protocol { command, response },
    }
}

/// Hand each stdout line to the oldest waiting request.
async fn read_responses(stdout: ChildStdout, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "adapter stdout failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, %line, "unparseable adapter output");
                continue;
            }
        };

        let waiter = lock(&pending).queue.pop_front();
        match waiter {
            // A timed-out request has dropped its receiver; its late
            // response is discarded here.
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => warn!(%response, "adapter output with no pending request"),
        }
    }

    // Fail anything still waiting, and anything sent from now on.
    let mut waiters = lock(&pending);
    waiters.closed = true;
    waiters.queue.clear();
    drop(waiters);
    debug!("adapter stdout closed");
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        warn!(target: "hubspace::adapter", "{line}");
    }
}
