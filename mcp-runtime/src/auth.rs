use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config::OperatorConfig;

/// Default upper bound on the credential exchange. Data calls use the client
/// default.
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request timed out after {0:?}")]
    Timeout(Duration),
    #[error("token request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("token response is missing access_token: {0}")]
    MalformedResponse(#[source] reqwest::Error),
}

/// OAuth2 access token. Never printed.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client-credentials token source. Every call performs a fresh exchange.
#[derive(Clone, Debug)]
pub struct TokenProvider {
    config: Arc<OperatorConfig>,
    http: reqwest::Client,
    timeout: Duration,
}

impl TokenProvider {
    pub fn new(config: Arc<OperatorConfig>, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            timeout: TOKEN_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn acquire_token(&self) -> Result<BearerToken, AuthError> {
        let response = self
            .http
            .post(self.config.token_url.clone())
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "client_credentials"),
                ("scope", self.config.scope.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    tracing::warn!(
                        event = "operator_token_timeout",
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Token request timed out"
                    );
                    AuthError::Timeout(self.timeout)
                } else {
                    AuthError::Request(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                event = "operator_token_rejected",
                status = status.as_u16(),
                "Token endpoint rejected client credentials"
            );
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(AuthError::MalformedResponse)?;
        tracing::debug!(event = "operator_token_acquired", "Operator token acquired");
        Ok(BearerToken(token.access_token))
    }
}
