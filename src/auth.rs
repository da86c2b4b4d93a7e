//! Resolution of the outbound `Authorization` header value.
//!
//! Tokens are derived fresh for every export call and never cached.

use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::{CloudConfig, ExportConfig, SelfHostedCredentials};
use crate::error::AuthenticationError;
use crate::io::{HttpRequest, HttpTransport};

/// Cloud token exchange endpoint.
pub const CLOUD_AUTHENTICATE_URL: &str = "https://xray.cloud.getxray.app/api/v2/authenticate";

/// Upper bound on how much of an authentication response is read.
const MAX_AUTH_RESPONSE: u64 = 16 * 1024;

/// Length of the response snippet kept for diagnostics.
const DIAGNOSTIC_SNIPPET: usize = 512;

/// Authorization header value, e.g. `Basic dXNlcjpwYXNz` or `Bearer abc`.
///
/// `Debug` and `Display` never show the credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    fn bearer(token: &str) -> Self {
        AuthToken(format!("Bearer {token}"))
    }

    fn basic(username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        AuthToken(format!("Basic {encoded}"))
    }

    /// The raw header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"Basic"` or `"Bearer"`.
    pub fn scheme(&self) -> &str {
        self.0.split(' ').next().unwrap_or_default()
    }

    /// Header value flagged as sensitive so it stays out of debug output.
    pub fn to_header_value(&self) -> Result<HeaderValue, AuthenticationError> {
        let mut value =
            HeaderValue::from_str(&self.0).map_err(|_| AuthenticationError::InvalidToken)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthToken({} <redacted>)", self.scheme())
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <redacted>", self.scheme())
    }
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

/// Turns an [`ExportConfig`] into an [`AuthToken`].
pub struct CredentialResolver<'a, T: HttpTransport + ?Sized> {
    transport: &'a T,
}

impl<'a, T: HttpTransport + ?Sized> CredentialResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Produce the header value for `config`.
    ///
    /// Self-hosted credentials are encoded locally; cloud credentials are
    /// exchanged for a bearer token with one POST, without retry.
    pub async fn resolve(&self, config: &ExportConfig) -> Result<AuthToken, AuthenticationError> {
        match config {
            ExportConfig::SelfHosted(server) => Ok(match server.credentials() {
                SelfHostedCredentials::PersonalAccessToken(token) => AuthToken::bearer(token),
                SelfHostedCredentials::Basic { username, password } => {
                    AuthToken::basic(username, password)
                }
            }),
            ExportConfig::Cloud(cloud) => self.exchange(cloud).await,
        }
    }

    #[instrument(skip_all, fields(client_id = %cloud.client_id()))]
    async fn exchange(&self, cloud: &CloudConfig) -> Result<AuthToken, AuthenticationError> {
        let payload = serde_json::to_vec(&AuthenticateRequest {
            client_id: cloud.client_id(),
            client_secret: cloud.client_secret(),
        })
        .map_err(|e| AuthenticationError::Request(e.to_string()))?;

        let url = Url::parse(CLOUD_AUTHENTICATE_URL)
            .map_err(|e| AuthenticationError::Request(e.to_string()))?;
        let request = HttpRequest::post(url, payload)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let resp = self.transport.send(request).await?;
        let status = resp.status;
        // One byte past the limit tells a cut-off body from one that fits
        let body = resp
            .read_text_limited(MAX_AUTH_RESPONSE + 1)
            .await
            .map_err(|e| AuthenticationError::Transport(e.into()))?;

        if !status.is_success() {
            return Err(AuthenticationError::Rejected {
                status,
                body: snippet(&body),
            });
        }
        if body.len() as u64 > MAX_AUTH_RESPONSE {
            return Err(AuthenticationError::ResponseTooLarge {
                limit: MAX_AUTH_RESPONSE,
            });
        }

        let token = parse_token(&body).ok_or(AuthenticationError::EmptyToken)?;
        debug!("token exchange succeeded");
        Ok(AuthToken::bearer(&token))
    }
}

/// The endpoint answers with a JSON string literal such as `"abc123"`.
fn parse_token(body: &str) -> Option<String> {
    let token = match serde_json::from_str::<String>(body) {
        Ok(token) => token,
        Err(_) => body.trim().trim_matches('"').to_string(),
    };
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(DIAGNOSTIC_SNIPPET).collect()
}
