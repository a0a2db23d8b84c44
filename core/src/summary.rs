use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Active,
    Inactive,
    Ok,
    NoData,
}

/// `{status, detail}` answer for "nothing to report" outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusDetail {
    pub status: RecordStatus,
    pub detail: &'static str,
}

/// In-band report of a non-2xx upstream status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamFailure {
    pub error: String,
    pub detail: String,
}

impl UpstreamFailure {
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        Self {
            error: format!("API returned {status}"),
            detail: String::from_utf8_lossy(body).into_owned(),
        }
    }
}

/// In-band error carrying only a message, e.g. an unresolved SIM.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

pub fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
