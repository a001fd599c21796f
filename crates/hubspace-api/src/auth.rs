use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use url::Url;

use crate::error::Error;

const DEFAULT_TOKEN_URL: &str =
    "https://accounts.hubspaceconnect.com/auth/realms/thd/protocol/openid-connect/token";
const DEFAULT_API_URL: &str = "https://api2.afero.net/";
const DEFAULT_CLIENT_ID: &str = "hubspace_android";

/// Tokens are renewed this long before the server-side expiry.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Hubspace account credentials.
///
/// The password is only exposed while building the token request body.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Where the client sends its requests.
///
/// `api_url` is normalized to end with `/` so relative joins like
/// `v1/users/me` stay under any path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub token_url: Url,
    pub api_url: Url,
    pub client_id: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: Url::parse(DEFAULT_TOKEN_URL).expect("default token URL is valid"),
            api_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            client_id: DEFAULT_CLIENT_ID.into(),
        }
    }
}

impl Endpoints {
    /// Build endpoints from raw strings, normalizing the API base path.
    pub fn new(token_url: &str, api_url: &str, client_id: impl Into<String>) -> Result<Self, Error> {
        let token_url = Url::parse(token_url)?;
        let mut api_url = Url::parse(api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self {
            token_url,
            api_url,
            client_id: client_id.into(),
        })
    }

    /// Join a relative API path (e.g. `"v1/users/me"`) onto the API base.
    pub(crate) fn api(&self, path: &str) -> Result<Url, Error> {
        Ok(self.api_url.join(path)?)
    }
}

/// A bearer token with its renewal material.
#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub access: SecretString,
    pub refresh: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(access: String, refresh: Option<String>, expires_in_secs: i64) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.map(Into::into),
            expires_at: expiry_after(Utc::now(), expires_in_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        expiry_after(Utc::now(), EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

/// `now + secs`, saturating at the representable bounds.
fn expiry_after(now: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    let saturated = if secs < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    };
    TimeDelta::try_seconds(secs)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(saturated)
}
