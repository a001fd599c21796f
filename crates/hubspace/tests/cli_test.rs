//! Integration tests for the `hubspace-cli` and `hubspace-session` binaries.
//!
//! Network-facing cases run against a wiremock Afero cloud; everything
//! else runs without any network access.
#![allow(clippy::unwrap_used)]

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::MockServer;

use common::{CLEARED_ENV, ISOLATED_CONFIG, cloud_env, mount_cloud, mount_rejected_login};

// ── Helpers ─────────────────────────────────────────────────────────

fn isolate(cmd: &mut assert_cmd::Command) {
    cmd.env("HUBSPACE_CONFIG", ISOLATED_CONFIG);
    for var in CLEARED_ENV {
        cmd.env_remove(var);
    }
}

fn classic_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hubspace-cli");
    isolate(&mut cmd);
    cmd
}

fn session_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hubspace-session");
    isolate(&mut cmd);
    cmd
}

fn stdout_lines(output: &std::process::Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn mock_cloud(rejected: bool) -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(async {
        let server = MockServer::start().await;
        if rejected {
            mount_rejected_login(&server).await;
        } else {
            mount_cloud(&server).await;
        }
        server
    });
    (rt, server)
}

// ── Sanity check ────────────────────────────────────────────────────

#[test]
fn test_sanity_check_classic() {
    classic_cmd()
        .arg("--sanity-check")
        .assert()
        .success()
        .stdout("{\"status\":\"ok\",\"message\":\"Hubspace CLI is responsive.\"}\n");
}

#[test]
fn test_sanity_check_session() {
    let output = session_cmd().arg("--sanity-check").output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec![json!({ "status": "ok", "message": "Hubspace CLI is responsive." })]
    );
}

// ── Usage ───────────────────────────────────────────────────────────

#[test]
fn test_classic_without_credentials_is_usage_error() {
    classic_cmd()
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_classic_without_password_is_usage_error() {
    classic_cmd()
        .arg("me@example.com")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing password"));
}

#[test]
fn test_classic_bad_polling_interval() {
    classic_cmd()
        .args(["me@example.com", "pw", "soon"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("soon"));
}

#[test]
fn test_session_unknown_flag_is_usage_error() {
    session_cmd()
        .arg("--bogus")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("--bogus"));
}

#[test]
fn test_help_flag() {
    classic_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sanity-check").and(predicate::str::contains("POLLING_INTERVAL")));
}

// ── Session dialect over stdin ──────────────────────────────────────

#[test]
fn test_session_script_without_login() {
    let output = session_cmd()
        .write_stdin(concat!(
            "{\"command\":\"get_devices\"}\n",
            "not json\n",
            "\n",
            "{\"command\":\"dance\"}\n",
            "{\"command\":\"close\"}\n",
            "{\"command\":\"get_devices\"}\n",
        ))
        .output()
        .unwrap();

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 4, "no output after close: {lines:?}");
    assert_eq!(lines[0], json!({ "error": "not logged in" }));
    assert!(
        lines[1]["JSON Error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON: ")
    );
    assert_eq!(lines[2], json!({ "error": "Unknown command: dance" }));
    assert_eq!(lines[3], json!({ "status": "closing" }));
}

#[test]
fn test_session_end_of_input_exits_quietly() {
    session_cmd()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

// ── Against a mock cloud ────────────────────────────────────────────

#[test]
fn test_classic_lists_and_sets_switches() {
    let (_rt, server) = mock_cloud(false);

    let output = classic_cmd()
        .envs(cloud_env(&server))
        .args(["me@example.com", "pw"])
        .write_stdin(concat!(
            "{\"command\":\"list_devices\"}\n",
            "{\"command\":\"set_switch\",\"device_id\":\"meta-1\",\"state\":\"off\"}\n",
            "{\"command\":\"set_switch\",\"device_id\":\"meta-2\",\"state\":\"on\"}\n",
        ))
        .output()
        .unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let lines = stdout_lines(&output);
    assert_eq!(
        lines[0],
        json!([{
            "id": "meta-1",
            "device_id": "meta-1",
            "default_name": "Switch",
            "name": "Porch Light",
            "type": "switch",
            "state": { "power": true }
        }])
    );
    assert_eq!(lines[1], json!({ "status": "ok" }));
    assert_eq!(lines[2], json!({ "Unknown Error": "Device not found: meta-2" }));
    assert_eq!(lines[3], json!({ "closed": true }));
}

#[test]
fn test_classic_rejected_login_exits_with_auth_code() {
    let (_rt, server) = mock_cloud(true);

    classic_cmd()
        .envs(cloud_env(&server))
        .args(["me@example.com", "wrong"])
        .write_stdin("")
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Invalid user credentials"));
}

#[test]
fn test_session_login_and_list() {
    let (_rt, server) = mock_cloud(false);

    let output = session_cmd()
        .envs(cloud_env(&server))
        .write_stdin(concat!(
            "{\"command\":\"login\",\"email\":\"me@example.com\",\"password\":\"pw\"}\n",
            "{\"command\":\"get_devices\"}\n",
            "{\"command\":\"set_device_state\",\"device_id\":\"meta-1\",\"state\":{\"power\":\"off\"}}\n",
        ))
        .output()
        .unwrap();

    assert!(output.status.success());
    let lines = stdout_lines(&output);
    assert_eq!(lines[0], json!({ "status": "ok" }));
    let devices = lines[1]["devices"].as_array().unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[1]["state"]["power"], Value::Null);
    assert_eq!(lines[2], json!({ "status": "ok" }));
    assert_eq!(lines.len(), 3);
}

// ── Signals ─────────────────────────────────────────────────────────

#[cfg(unix)]
mod signals {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::process::{Child, ChildStdin, Command, Stdio};
    use std::time::{Duration, Instant};

    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use wiremock::MockServer;

    use super::mock_cloud;
    use crate::common::{CLEARED_ENV, cloud_env};

    const DEADLINE: Duration = Duration::from_secs(10);

    fn spawn_classic(server: &MockServer, settle_delay: &str) -> (Child, ChildStdin) {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hubspace-cli"));
        cmd.envs(cloud_env(server))
            .env("HUBSPACE_SETTLE_DELAY", settle_delay)
            .args(["me@example.com", "pw"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        for var in CLEARED_ENV {
            cmd.env_remove(var);
        }
        let mut child = cmd.spawn().unwrap();
        // Held by the caller so the adapter never sees end of input.
        let stdin = child.stdin.take().unwrap();
        (child, stdin)
    }

    fn terminate(child: &Child) {
        let status = Command::new("kill")
            .args(["-TERM", &child.id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    fn wait_for_exit(child: &mut Child) -> std::process::ExitStatus {
        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().unwrap() {
                return status;
            }
            if started.elapsed() > DEADLINE {
                let _ = child.kill();
                panic!("adapter did not exit within {DEADLINE:?} of SIGTERM");
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    fn remaining_lines(stdout: impl Read) -> Vec<Value> {
        BufReader::new(stdout)
            .lines()
            .map(|line| serde_json::from_str(&line.unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn test_sigterm_while_waiting_for_input_closes_cleanly() {
        let (_rt, server) = mock_cloud(false);
        let (mut child, mut stdin) = spawn_classic(&server, "0");

        writeln!(stdin, "{{\"command\":\"list_devices\"}}").unwrap();
        stdin.flush().unwrap();
        let mut stdout = BufReader::new(child.stdout.take().unwrap());
        let mut first = String::new();
        stdout.read_line(&mut first).unwrap();
        let listing: Value = serde_json::from_str(&first).unwrap();
        assert!(listing.is_array(), "loop is serving: {listing}");

        terminate(&child);
        let status = wait_for_exit(&mut child);

        assert!(status.success(), "exit status: {status}");
        assert_eq!(remaining_lines(stdout), vec![json!({ "closed": true })]);
        drop(stdin);
    }

    #[test]
    fn test_sigterm_during_settle_delay_closes_cleanly() {
        let (rt, server) = mock_cloud(false);
        let (mut child, stdin) = spawn_classic(&server, "30");

        // The settle delay starts once the initial listing has been fetched.
        let started = Instant::now();
        loop {
            let requests = rt.block_on(server.received_requests()).unwrap_or_default();
            if requests.iter().any(|r| r.url.path().ends_with("/metadevices")) {
                break;
            }
            assert!(started.elapsed() < DEADLINE, "adapter never fetched devices");
            std::thread::sleep(Duration::from_millis(20));
        }

        terminate(&child);
        let status = wait_for_exit(&mut child);

        assert!(status.success(), "exit status: {status}");
        let stdout = child.stdout.take().unwrap();
        assert_eq!(remaining_lines(stdout), vec![json!({ "closed": true })]);
        drop(stdin);
    }
}
