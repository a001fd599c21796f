#![allow(clippy::unwrap_used)]
// Command-loop tests against an in-memory bridge.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};

use hubspace_core::{
    Adapter, Bridge, Connector, CoreError, Credentials, Device, PowerState, ResourceController,
    Scope, Shutdown, ThreadedLines,
};

// ── Fakes ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Calls {
    set_state: Mutex<Vec<(Scope, String, bool)>>,
    closed: AtomicUsize,
}

struct FakeController {
    scope: Scope,
    items: Vec<Arc<Device>>,
    calls: Arc<Calls>,
}

impl ResourceController for FakeController {
    fn items(&self) -> Vec<Arc<Device>> {
        self.items.clone()
    }

    fn get(&self, id: &str) -> Option<Arc<Device>> {
        self.items.iter().find(|d| d.id == id).cloned()
    }

    async fn initialize(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn set_state(&self, id: &str, on: bool) -> Result<(), CoreError> {
        if id == "broken" {
            return Err(CoreError::Api {
                message: "device offline".into(),
                status: Some(503),
            });
        }
        self.calls
            .set_state
            .lock()
            .unwrap()
            .push((self.scope, id.to_owned(), on));
        Ok(())
    }
}

struct FakeBridge {
    devices: FakeController,
    switches: FakeController,
    calls: Arc<Calls>,
}

impl FakeBridge {
    fn new(calls: &Arc<Calls>) -> Self {
        let all: Vec<Arc<Device>> = vec![
            Arc::new(device("sw-1", "switch", Some(PowerState::On))),
            Arc::new(device("fan-1", "fan", None)),
            Arc::new(device("broken", "switch", Some(PowerState::Off))),
        ];
        let switches = all
            .iter()
            .filter(|d| Scope::Switches.admits(d))
            .cloned()
            .collect();
        Self {
            devices: FakeController {
                scope: Scope::Devices,
                items: all,
                calls: Arc::clone(calls),
            },
            switches: FakeController {
                scope: Scope::Switches,
                items: switches,
                calls: Arc::clone(calls),
            },
            calls: Arc::clone(calls),
        }
    }
}

impl Bridge for FakeBridge {
    type Controller = FakeController;

    async fn initialize(&self) -> Result<(), CoreError> {
        Ok(())
    }

    fn devices(&self) -> &FakeController {
        &self.devices
    }

    fn switches(&self) -> &FakeController {
        &self.switches
    }

    async fn close(&self) {
        self.calls.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct FakeConnector {
    calls: Arc<Calls>,
    logins: Mutex<Vec<(String, Option<Duration>)>>,
}

impl Connector for FakeConnector {
    type Bridge = FakeBridge;

    async fn connect(
        &self,
        credentials: Credentials,
        polling_interval: Option<Duration>,
    ) -> Result<FakeBridge, CoreError> {
        if credentials.email == "bad@example.com" {
            return Err(CoreError::AuthenticationFailed {
                message: "Invalid user credentials".into(),
            });
        }
        self.logins
            .lock()
            .unwrap()
            .push((credentials.email, polling_interval));
        Ok(FakeBridge::new(&self.calls))
    }
}

fn device(id: &str, class: &str, power: Option<PowerState>) -> Device {
    Device {
        id: id.into(),
        default_name: format!("{class} default"),
        name: format!("{id} name"),
        device_class: class.into(),
        power,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

async fn run(adapter: &mut Adapter<FakeConnector>, script: &str) -> Vec<Value> {
    let mut input = BufReader::new(Cursor::new(script.to_owned().into_bytes())).lines();
    let mut output = Vec::new();
    adapter.run(&mut input, &mut output).await.unwrap();
    parse_lines(&output)
}

fn parse_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn classic(calls: &Arc<Calls>) -> Adapter<FakeConnector> {
    Adapter::classic(FakeBridge::new(calls), Shutdown::new())
}

fn session(connector: FakeConnector) -> Adapter<FakeConnector> {
    Adapter::session(connector, Shutdown::new())
}

const LOGIN: &str = r#"{"command":"login","email":"me@example.com","password":"pw"}"#;

// ── Classic dialect ─────────────────────────────────────────────────

#[tokio::test]
async fn classic_lists_switches_as_array() {
    let calls = Arc::new(Calls::default());
    let mut adapter = classic(&calls);

    let out = run(&mut adapter, "{\"command\":\"list_devices\"}\n").await;

    assert_eq!(
        out[0],
        json!([
            {
                "id": "sw-1",
                "device_id": "sw-1",
                "default_name": "switch default",
                "name": "sw-1 name",
                "type": "switch",
                "state": { "power": true }
            },
            {
                "id": "broken",
                "device_id": "broken",
                "default_name": "switch default",
                "name": "broken name",
                "type": "switch",
                "state": { "power": false }
            }
        ])
    );
    assert_eq!(out[1], json!({ "closed": true }));
    assert_eq!(calls.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn classic_set_switch_goes_through_switches() {
    let calls = Arc::new(Calls::default());
    let mut adapter = classic(&calls);

    let out = run(
        &mut adapter,
        concat!(
            r#"{"command":"set_switch","device_id":"sw-1","state":"on"}"#,
            "\n",
            r#"{"command":"set_switch","device_id":"sw-1","state":"ON"}"#,
            "\n",
            r#"{"command":"set_switch","device_id":"sw-1"}"#,
            "\n",
        ),
    )
    .await;

    assert_eq!(out[..3].to_vec(), vec![json!({ "status": "ok" }); 3]);
    assert_eq!(
        *calls.set_state.lock().unwrap(),
        vec![
            (Scope::Switches, "sw-1".to_owned(), true),
            (Scope::Switches, "sw-1".to_owned(), false),
            (Scope::Switches, "sw-1".to_owned(), false),
        ]
    );
}

#[tokio::test]
async fn classic_errors_use_titled_keys_and_loop_continues() {
    let calls = Arc::new(Calls::default());
    let mut adapter = classic(&calls);

    let out = run(
        &mut adapter,
        concat!(
            "{not json\n",
            "   \n",
            r#"{"command":"dance"}"#,
            "\n",
            r#"{"command":"set_switch","device_id":"missing","state":"on"}"#,
            "\n",
            r#"{"command":"set_switch","device_id":"broken","state":"on"}"#,
            "\n",
            r#"{"command":"list_devices"}"#,
            "\n",
        ),
    )
    .await;

    assert_eq!(out.len(), 6);
    assert!(
        out[0]["JSON Error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON: ")
    );
    assert_eq!(out[1], json!({ "Unknown Command Error": "Unknown command: dance" }));
    assert_eq!(out[2], json!({ "Unknown Error": "Device not found: missing" }));
    assert_eq!(out[3], json!({ "Unknown Error": "API error: device offline" }));
    assert!(out[4].is_array());
    assert_eq!(out[5], json!({ "closed": true }));
}

#[tokio::test]
async fn classic_close_stops_reading() {
    let calls = Arc::new(Calls::default());
    let mut adapter = classic(&calls);

    let out = run(
        &mut adapter,
        concat!(
            r#"{"command":"close"}"#,
            "\n",
            r#"{"command":"list_devices"}"#,
            "\n",
        ),
    )
    .await;

    assert_eq!(
        out,
        vec![json!({ "status": "closing" }), json!({ "closed": true })]
    );
    assert_eq!(calls.closed.load(Ordering::SeqCst), 1);
    assert!(adapter.bridge().is_none());
}

#[tokio::test]
async fn triggered_shutdown_skips_input() {
    let calls = Arc::new(Calls::default());
    let shutdown = Shutdown::new();
    let mut adapter = Adapter::<FakeConnector>::classic(FakeBridge::new(&calls), shutdown.clone());
    shutdown.trigger();

    let out = run(&mut adapter, "{\"command\":\"list_devices\"}\n").await;

    assert_eq!(out, vec![json!({ "closed": true })]);
    assert_eq!(calls.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_utf8_line_is_a_json_error() {
    let calls = Arc::new(Calls::default());
    let mut adapter = classic(&calls);
    let mut bytes = vec![0xc3, 0x28, b'\n'];
    bytes.extend_from_slice(b"{\"command\":\"close\"}\n");
    let mut input = ThreadedLines::spawn(Cursor::new(bytes)).unwrap();
    let mut output = Vec::new();

    adapter.run(&mut input, &mut output).await.unwrap();
    let out = parse_lines(&output);

    assert!(out[0].get("JSON Error").is_some());
    assert_eq!(out[1], json!({ "status": "closing" }));
}

// ── Session dialect ─────────────────────────────────────────────────

#[tokio::test]
async fn session_requires_login() {
    let mut adapter = session(FakeConnector::default());

    let out = run(
        &mut adapter,
        concat!(
            r#"{"command":"get_devices"}"#,
            "\n",
            r#"{"command":"set_device_state","device_id":"sw-1","state":"on"}"#,
            "\n",
        ),
    )
    .await;

    assert_eq!(
        out,
        vec![
            json!({ "error": "not logged in" }),
            json!({ "error": "not logged in" }),
        ]
    );
}

#[tokio::test]
async fn session_login_then_list_wraps_devices() {
    let connector = FakeConnector::default();
    let calls = Arc::clone(&connector.calls);
    let mut adapter = session(connector);

    let script = format!("{LOGIN}\n{{\"command\":\"get_devices\"}}\n");
    let out = run(&mut adapter, &script).await;

    assert_eq!(out[0], json!({ "status": "ok" }));
    let devices = out[1]["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[1]["id"], "fan-1");
    assert_eq!(devices[1]["state"]["power"], Value::Null);
    assert_eq!(out.len(), 2, "session emits no closing line");
    assert_eq!(calls.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn session_set_device_state_accepts_power_object() {
    let connector = FakeConnector::default();
    let calls = Arc::clone(&connector.calls);
    let mut adapter = session(connector);

    let script = format!(
        "{LOGIN}\n{}\n{}\n",
        r#"{"command":"set_device_state","device_id":"fan-1","state":{"power":"on"}}"#,
        r#"{"command":"set_device_state","device_id":"fan-1","state":"sideways"}"#,
    );
    let out = run(&mut adapter, &script).await;

    assert_eq!(out[1], json!({ "status": "ok" }));
    assert_eq!(
        out[2],
        json!({ "error": "invalid command: unsupported power state 'sideways'" })
    );
    assert_eq!(
        *calls.set_state.lock().unwrap(),
        vec![(Scope::Devices, "fan-1".to_owned(), true)]
    );
}

#[tokio::test]
async fn session_login_failure_and_relogin() {
    let connector = FakeConnector::default();
    let calls = Arc::clone(&connector.calls);
    let mut adapter = session(connector);

    let script = format!(
        "{}\n{LOGIN}\n{}\n",
        r#"{"command":"login","email":"bad@example.com","password":"pw"}"#,
        r#"{"command":"login","email":"me@example.com","password":"pw","polling_interval":5}"#,
    );
    let out = run(&mut adapter, &script).await;

    assert_eq!(
        out,
        vec![
            json!({ "error": "Authentication failed: Invalid user credentials" }),
            json!({ "status": "ok" }),
            json!({ "status": "ok" }),
        ]
    );
    // First session closed on re-login, second on end of input.
    assert_eq!(calls.closed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn session_login_requires_credentials() {
    let mut adapter = session(FakeConnector::default());

    let out = run(&mut adapter, "{\"command\":\"login\",\"email\":\"me@example.com\"}\n").await;

    assert_eq!(out, vec![json!({ "error": "missing required field 'password'" })]);
}

#[tokio::test]
async fn session_unknown_command_uses_error_key() {
    let mut adapter = session(FakeConnector::default());

    let out = run(&mut adapter, "{\"command\":\"set_switch\"}\n{}\n").await;

    assert_eq!(
        out,
        vec![
            json!({ "error": "Unknown command: set_switch" }),
            json!({ "error": "Unknown command: null" }),
        ]
    );
}
