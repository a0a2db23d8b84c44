use thiserror::Error;

/// A response body that could not be mapped onto the expected payload shape.
///
/// Upstream status failures are not errors at this level; they are reported
/// in-band through [`crate::summary::UpstreamFailure`]. This type covers bodies
/// that claim success but cannot be read.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body was not valid JSON, or did not match the payload shape
    #[error("malformed {endpoint} response: {source}")]
    Malformed {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// A usage counter held a string that is not an integer
    #[error("usage counter '{field}' is not an integer: {value:?}")]
    InvalidCounter { field: &'static str, value: String },
}

impl PayloadError {
    pub fn code(&self) -> &'static str {
        match self {
            PayloadError::Malformed { .. } => codes::MALFORMED_RESPONSE,
            PayloadError::InvalidCounter { .. } => codes::MALFORMED_RESPONSE,
        }
    }
}

/// Error codes shared by the runtime and its transports
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const AUTH_FAILED: &str = "auth_failed";
    pub const CONNECTION_ERROR: &str = "connection_error";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const MALFORMED_RESPONSE: &str = "malformed_response";
    pub const UNKNOWN_TOOL: &str = "unknown_tool";
}
