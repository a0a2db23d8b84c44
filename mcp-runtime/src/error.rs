use serde_json::{Value, json};
use transatel_core::error::{PayloadError, codes};

use crate::auth::AuthError;
use crate::operator::OperatorError;

#[derive(Debug)]
pub(crate) struct RpcError {
    pub(crate) code: i64,
    pub(crate) message: String,
}

impl RpcError {
    pub(crate) fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "Parse error".to_string(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    pub(crate) fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    pub(crate) fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

/// Failure of a tool handler, returned to the host as an `isError` result.
#[derive(Debug, Clone)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    pub field: Option<String>,
    pub docs_hint: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            docs_hint: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_docs_hint(mut self, docs_hint: impl Into<String>) -> Self {
        self.docs_hint = Some(docs_hint.into());
        self
    }

    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.code,
            "message": self.message
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(docs_hint) = &self.docs_hint {
            payload["docs_hint"] = Value::String(docs_hint.clone());
        }
        payload
    }
}

impl From<AuthError> for ToolError {
    fn from(err: AuthError) -> Self {
        ToolError::new(codes::AUTH_FAILED, format!("Failed to generate token: {err}"))
            .with_docs_hint("Check ACCESS_TOKEN_URL, CLIENT_ID, CLIENT_SECRET and SCOPE.")
    }
}

impl From<PayloadError> for ToolError {
    fn from(err: PayloadError) -> Self {
        ToolError::new(err.code(), err.to_string())
    }
}

impl From<OperatorError> for ToolError {
    fn from(err: OperatorError) -> Self {
        match err {
            OperatorError::Payload(inner) => inner.into(),
            OperatorError::Status { .. } => ToolError::new(codes::UPSTREAM_ERROR, err.to_string()),
            OperatorError::Connection { .. } | OperatorError::InvalidBaseUrl(_) => {
                ToolError::new(codes::CONNECTION_ERROR, err.to_string())
                    .with_docs_hint("Ensure TRANSATEL_API_URL points to the operator API.")
            }
        }
    }
}
