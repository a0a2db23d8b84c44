use std::fmt;

use clap::Args;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.transatel.com";

/// Operator credentials and endpoints, read once at startup.
#[derive(Args, Clone)]
pub struct OperatorArgs {
    /// OAuth2 token endpoint used for the client-credentials exchange
    #[arg(long, env = "ACCESS_TOKEN_URL")]
    pub access_token_url: String,
    /// OAuth2 client id
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: String,
    /// OAuth2 client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,
    /// Scope requested with every token
    #[arg(long, env = "SCOPE")]
    pub scope: String,
    /// Base URL of the operator REST APIs
    #[arg(long, env = "TRANSATEL_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,
}

impl fmt::Debug for OperatorArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorArgs")
            .field("access_token_url", &self.access_token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{name} must be an http(s) base URL, got '{value}'")]
    NotABaseUrl { name: &'static str, value: String },
}

/// Immutable credential set shared by every tool invocation.
#[derive(Clone)]
pub struct OperatorConfig {
    pub token_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub api_url: Url,
}

impl fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("token_url", &self.token_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

impl OperatorArgs {
    pub fn into_config(self) -> Result<OperatorConfig, ConfigError> {
        Ok(OperatorConfig {
            token_url: parse_http_url("ACCESS_TOKEN_URL", &self.access_token_url)?,
            client_id: self.client_id,
            client_secret: self.client_secret,
            scope: self.scope,
            api_url: parse_http_url("TRANSATEL_API_URL", &self.api_url)?,
        })
    }
}

fn parse_http_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { name, source })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::NotABaseUrl {
            name,
            value: raw.to_string(),
        });
    }
    Ok(url)
}
