use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crate::error::{Result, RetrieverError};
use crate::http::transport_error;
use crate::secret::{redact, snippet};

/// Bearer token for the current run. Never persisted, never printed.
pub struct BearerToken {
    access_token: SecretString,
    /// Lifetime in seconds, if the identity provider sent one
    pub expires_in: Option<u64>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>, expires_in: Option<u64>) -> Self {
        BearerToken {
            access_token: SecretString::from(access_token.into()),
            expires_in,
        }
    }

    /// Value for the `Authorization` header.
    pub(crate) fn header_value(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    pub fn expose(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Scrub this token out of text bound for the user.
    pub(crate) fn redact(&self, text: &str) -> String {
        redact(text, &self.access_token)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Token endpoint response. Only the fields the client-credentials flow
/// uses; anything else is ignored.
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    /// Only a hint; providers send it as an integer, a float or a string
    #[serde(default)]
    expires_in: Option<Value>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn expiry_secs(&self) -> Option<u64> {
        self.expires_in.as_ref().and_then(lifetime_secs)
    }
}

/// Whole non-negative seconds, or `None` for anything unusable.
fn lifetime_secs(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_secs)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_secs))
        }
        _ => None,
    }
}

fn whole_secs(secs: f64) -> Option<u64> {
    if secs.is_finite() && secs >= 0.0 && secs.fract() == 0.0 && secs <= u64::MAX as f64 {
        Some(secs as u64)
    } else {
        None
    }
}

/// Exchanges client credentials for a bearer token
pub struct TokenAcquirer {
    client: reqwest::Client,
    token_url: String,
}

impl TokenAcquirer {
    pub fn new(client: reqwest::Client, token_url: impl Into<String>) -> Self {
        TokenAcquirer {
            client,
            token_url: token_url.into(),
        }
    }

    /// Perform a single client-credentials exchange. No retry.
    pub async fn acquire(&self, client_id: &str, client_secret: &SecretString) -> Result<BearerToken> {
        let fields = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
        ];

        tracing::debug!(url = %self.token_url, "requesting platform token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&fields)
            .send()
            .await
            .map_err(|e| transport_error("Token request", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("Token response", &e))?;

        if !status.is_success() {
            let message = redact(&snippet(&body), client_secret);
            tracing::warn!(status = status.as_u16(), "token endpoint rejected credentials");
            return Err(RetrieverError::AuthError {
                status: Some(status.as_u16()),
                message: if message.is_empty() {
                    status.canonical_reason().unwrap_or("no response body").to_string()
                } else {
                    message
                },
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| RetrieverError::auth(format!("Malformed token response: {}", e)))?;

        if let Some(token_type) = parsed.token_type.as_deref() {
            if !token_type.eq_ignore_ascii_case("bearer") {
                return Err(RetrieverError::auth(format!(
                    "Unsupported token type: {}",
                    token_type
                )));
            }
        }

        let access_token = parsed
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RetrieverError::auth("Token response has no access_token"))?;

        let expires_in = parsed.expiry_secs();
        tracing::info!(expires_in = ?expires_in, "bearer token acquired");

        Ok(BearerToken::new(access_token, expires_in))
    }
}
