// Shared fixtures: a wiremock Afero cloud and env isolation for the bins.
#![allow(dead_code, clippy::unwrap_used)]

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ISOLATED_CONFIG: &str = "/tmp/hubspace-test-nonexistent/config.toml";

/// Environment for a child adapter pointed at `server`.
pub fn cloud_env(server: &MockServer) -> Vec<(&'static str, String)> {
    vec![
        ("HUBSPACE_CONFIG", ISOLATED_CONFIG.to_owned()),
        ("HUBSPACE_AUTH_URL", format!("{}/auth/token", server.uri())),
        ("HUBSPACE_API_URL", format!("{}/api", server.uri())),
        ("HUBSPACE_POLLING_INTERVAL", "0".to_owned()),
        ("HUBSPACE_SETTLE_DELAY", "0".to_owned()),
        ("HUBSPACE_TIMEOUT", "5".to_owned()),
    ]
}

/// Variables that must not leak in from the developer's shell.
pub const CLEARED_ENV: &[&str] = &["HUBSPACE_EMAIL", "HUBSPACE_PASSWORD", "RUST_LOG"];

pub async fn mount_cloud(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "refresh_token": "refresh-1",
            "expires_in": 3600,
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountAccess": [{ "account": { "accountId": "acct-1" } }]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/acct-1/metadevices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "meta-1",
                "typeId": "metadevice.device",
                "friendlyName": "Porch Light",
                "description": { "device": { "defaultName": "Switch", "deviceClass": "switch" } },
                "state": { "values": [
                    { "functionClass": "power", "functionInstance": null, "value": "on" }
                ]}
            },
            {
                "id": "meta-2",
                "typeId": "metadevice.device",
                "friendlyName": "Ceiling Fan",
                "description": { "device": { "defaultName": "Fan", "deviceClass": "fan" } },
                "state": { "values": [] }
            }
        ])))
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/accounts/acct-1/metadevices/meta-1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

pub async fn mount_rejected_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid user credentials",
        })))
        .mount(server)
        .await;
}
