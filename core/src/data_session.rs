use serde::Serialize;
use serde_json::Value;

use crate::error::PayloadError;
use crate::payload::{self, DataSession, DataSessionPayload};
use crate::summary::{self, RecordStatus, StatusDetail, UpstreamFailure};
use crate::tac::device_tac;

pub const NO_ACTIVE_SESSION: &str = "No active data session";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataSessionSummary {
    Active(ActiveSessions),
    Inactive(StatusDetail),
    Failed(UpstreamFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSessions {
    pub status: RecordStatus,
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub start_time: Option<Value>,
    pub last_update_time: Option<Value>,
    #[serde(rename = "mcc-mnc")]
    pub mcc_mnc: Option<Value>,
    pub apn: Option<Value>,
    pub rat_type: Option<Value>,
    #[serde(rename = "deviceTAC")]
    pub device_tac: Option<String>,
}

impl From<DataSession> for SessionRecord {
    fn from(session: DataSession) -> Self {
        let tac = device_tac(session.ps_information.first_imei());
        let ps = session.ps_information;
        Self {
            start_time: session.start_time,
            last_update_time: session.last_update_time,
            mcc_mnc: ps.ggsn_mcc_mnc,
            apn: ps.called_station_id,
            rat_type: ps.rat_type,
            device_tac: tac,
        }
    }
}

/// Summarize a data-session lookup.
///
/// 404 means the subscriber has no session; any other non-2xx is reported
/// in-band with the upstream body.
pub fn summarize(status: u16, body: &[u8]) -> Result<DataSessionSummary, PayloadError> {
    if status == 404 {
        return Ok(DataSessionSummary::Inactive(StatusDetail {
            status: RecordStatus::Inactive,
            detail: NO_ACTIVE_SESSION,
        }));
    }
    if !summary::is_success(status) {
        return Ok(DataSessionSummary::Failed(UpstreamFailure::from_response(
            status, body,
        )));
    }

    let payload: DataSessionPayload = payload::parse("data-session", body)?;
    Ok(DataSessionSummary::Active(ActiveSessions {
        status: RecordStatus::Active,
        sessions: payload.sessions.into_iter().map(SessionRecord::from).collect(),
    }))
}

pub fn normalize(status: u16, body: &[u8]) -> Result<String, PayloadError> {
    summarize(status, body).map(|summary| summary::to_json_string(&summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalized_value(status: u16, body: &Value) -> Value {
        let raw = normalize(status, body.to_string().as_bytes()).expect("normalize should succeed");
        serde_json::from_str(&raw).expect("output should be valid json")
    }

    #[test]
    fn not_found_is_inactive_without_sessions() {
        let raw = normalize(404, b"").expect("404 should normalize");
        assert_eq!(
            raw,
            r#"{"status":"inactive","detail":"No active data session"}"#
        );
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("sessions").is_none());
    }

    #[test]
    fn active_session_extracts_fields_and_tac() {
        let value = normalized_value(
            200,
            &json!({
                "sessions": [{
                    "startTime": "2026-10-01T08:00:00Z",
                    "lastUpdateTime": "2026-10-01T09:30:00Z",
                    "PS-Information": {
                        "3GPP-GGSN-MCC-MNC": "20801",
                        "Called-Station-Id": "internet.transatel",
                        "3GPP-RAT-Type": 6,
                        "User-Equipment-Info": [
                            { "User-Equipment-Info-Type": "IMEI", "User-Equipment-Info-Value": "3520990017614823" }
                        ]
                    }
                }]
            }),
        );

        assert_eq!(value["status"], "active");
        let session = &value["sessions"][0];
        assert_eq!(session["startTime"], "2026-10-01T08:00:00Z");
        assert_eq!(session["lastUpdateTime"], "2026-10-01T09:30:00Z");
        assert_eq!(session["mcc-mnc"], "20801");
        assert_eq!(session["apn"], "internet.transatel");
        assert_eq!(session["ratType"], 6);
        assert_eq!(session["deviceTAC"], "35209900");
    }

    #[test]
    fn session_without_imei_has_null_tac() {
        let value = normalized_value(
            200,
            &json!({ "sessions": [{ "PS-Information": { "User-Equipment-Info": [] } }] }),
        );
        assert!(value["sessions"][0]["deviceTAC"].is_null());
        assert!(value["sessions"][0]["apn"].is_null());
    }

    #[test]
    fn non_string_fields_pass_through_unchanged() {
        let value = normalized_value(
            200,
            &json!({
                "sessions": [{
                    "startTime": 1759305600,
                    "PS-Information": { "Called-Station-Id": 42 }
                }]
            }),
        );
        assert_eq!(value["sessions"][0]["startTime"], 1759305600);
        assert_eq!(value["sessions"][0]["apn"], 42);
    }

    #[test]
    fn empty_payload_is_active_with_no_sessions() {
        let value = normalized_value(200, &json!({}));
        assert_eq!(value, json!({ "status": "active", "sessions": [] }));
    }

    #[test]
    fn server_error_is_reported_in_band() {
        let value: Value =
            serde_json::from_str(&normalize(500, b"boom").unwrap()).expect("valid json");
        assert_eq!(value, json!({ "error": "API returned 500", "detail": "boom" }));
    }

    #[test]
    fn malformed_success_body_is_an_error() {
        let err = normalize(200, b"<html>").expect_err("html body must not parse");
        assert!(matches!(err, PayloadError::Malformed { endpoint: "data-session", .. }));
    }
}
