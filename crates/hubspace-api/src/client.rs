// Afero cloud HTTP client
//
// Wraps `reqwest::Client` with bearer-token handling and the handful of
// endpoints the adapter needs. The token is renewed transparently before
// each request once it is close to expiry.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Credentials, Endpoints, Token};
use crate::error::Error;
use crate::models::{FunctionState, Metadevice, StateUpdate, TokenResponse, UserInfo};
use crate::transport::TransportConfig;

/// Error body shape used by the token endpoint.
#[derive(serde::Deserialize)]
struct OAuthError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Async client for the Afero cloud API.
///
/// Holds the credentials it logged in with so an expired session can be
/// re-established without the caller's involvement.
pub struct AferoClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    credentials: Mutex<Option<Credentials>>,
    token: Mutex<Option<Token>>,
}

impl AferoClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from endpoints and a transport config.
    pub fn new(endpoints: Endpoints, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, endpoints))
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, endpoints: Endpoints) -> Self {
        Self {
            http,
            endpoints,
            credentials: Mutex::new(None),
            token: Mutex::new(None),
        }
    }

    // ── Authentication ───────────────────────────────────────────────

    /// Exchange email/password for a bearer token.
    ///
    /// On success the credentials are retained for later renewal.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        debug!(email = %credentials.email, "logging in at {}", self.endpoints.token_url);

        let form = [
            ("grant_type", "password"),
            ("client_id", self.endpoints.client_id.as_str()),
            ("username", credentials.email.as_str()),
            ("password", credentials.password.expose_secret()),
        ];
        let token = self.request_token(&form).await?;

        *self.token.lock().await = Some(token);
        *self.credentials.lock().await = Some(credentials.clone());
        debug!("login successful");
        Ok(())
    }

    /// Drop the session token and stored credentials.
    pub async fn logout(&self) {
        *self.token.lock().await = None;
        *self.credentials.lock().await = None;
        debug!("session cleared");
    }

    /// Returns `true` while a token is held (expired or not).
    pub async fn has_session(&self) -> bool {
        self.token.lock().await.is_some()
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<Token, Error> {
        let resp = self
            .http
            .post(self.endpoints.token_url.clone())
            .form(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OAuthError>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::Authentication { message });
        }

        let parsed: TokenResponse = parse_body(&body)?;
        Ok(Token::new(
            parsed.access_token,
            parsed.refresh_token,
            parsed.expires_in,
        ))
    }

    /// Current access token, renewing it first if it is about to expire.
    async fn bearer(&self) -> Result<SecretString, Error> {
        let mut guard = self.token.lock().await;
        let current = guard.as_ref().ok_or(Error::SessionExpired)?;
        if !current.is_expired() {
            return Ok(current.access.clone());
        }

        if let Some(refresh) = current.refresh.clone() {
            let form = [
                ("grant_type", "refresh_token"),
                ("client_id", self.endpoints.client_id.as_str()),
                ("refresh_token", refresh.expose_secret()),
            ];
            match self.request_token(&form).await {
                Ok(token) => {
                    debug!("token refreshed");
                    let access = token.access.clone();
                    *guard = Some(token);
                    return Ok(access);
                }
                Err(e) => warn!(error = %e, "token refresh failed, logging in again"),
            }
        }

        let credentials = self
            .credentials
            .lock()
            .await
            .clone()
            .ok_or(Error::SessionExpired)?;
        let form = [
            ("grant_type", "password"),
            ("client_id", self.endpoints.client_id.as_str()),
            ("username", credentials.email.as_str()),
            ("password", credentials.password.expose_secret()),
        ];
        let token = self.request_token(&form).await?;
        let access = token.access.clone();
        *guard = Some(token);
        Ok(access)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Resolve the first account the logged-in user can access.
    pub async fn account_id(&self) -> Result<String, Error> {
        let info: UserInfo = self.get(self.endpoints.api("v1/users/me")?).await?;
        info.account_access
            .into_iter()
            .next()
            .map(|a| a.account.account_id)
            .ok_or(Error::NoAccount)
    }

    /// List every metadevice on the account, with current state expanded.
    pub async fn list_metadevices(&self, account_id: &str) -> Result<Vec<Metadevice>, Error> {
        let mut url = self
            .endpoints
            .api(&format!("v1/accounts/{account_id}/metadevices"))?;
        url.query_pairs_mut().append_pair("expansions", "state");
        self.get(url).await
    }

    /// Write function values to a metadevice.
    ///
    /// Values without a `last_update_time` are stamped with the current time.
    pub async fn set_state(
        &self,
        account_id: &str,
        metadevice_id: &str,
        values: &[FunctionState],
    ) -> Result<(), Error> {
        let url = self.endpoints.api(&format!(
            "v1/accounts/{account_id}/metadevices/{metadevice_id}/state"
        ))?;
        let now = Utc::now().timestamp_millis();
        let stamped: Vec<FunctionState> = values
            .iter()
            .cloned()
            .map(|mut v| {
                v.last_update_time.get_or_insert(now);
                v
            })
            .collect();
        let body = StateUpdate {
            metadevice_id,
            values: &stamped,
        };
        self.put(url, &body).await
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;
        handle_response(resp).await
    }

    async fn put<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<(), Error> {
        debug!("PUT {url}");
        let token = self.bearer().await?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;
        handle_empty(resp).await
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();
    if status.is_success() {
        let body = resp.text().await?;
        parse_body(&body)
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(parse_error(status, resp).await)
    }
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    let raw = resp.text().await.unwrap_or_default();
    Error::Api {
        status: status.as_u16(),
        message: if raw.is_empty() {
            status.to_string()
        } else {
            raw.chars().take(200).collect()
        },
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.to_owned(),
        }
    })
}
