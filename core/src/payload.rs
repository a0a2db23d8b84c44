//! Upstream response shapes.
//!
//! Every field is optional: the operator APIs omit keys freely, and a missing
//! key must surface as `null` in the normalized record rather than as a parse
//! failure. Fields that are only passed through (dates, APN, operator names,
//! network codes) are kept as raw JSON values so whatever type upstream sends
//! is echoed unchanged. Only fields the adapter computes with are typed.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PayloadError;

pub(crate) fn parse<T>(endpoint: &'static str, body: &[u8]) -> Result<T, PayloadError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_slice(body).map_err(|source| PayloadError::Malformed { endpoint, source })
}

// --- data session ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DataSessionPayload {
    pub sessions: Vec<DataSession>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataSession {
    pub start_time: Option<Value>,
    pub last_update_time: Option<Value>,
    #[serde(rename = "PS-Information")]
    pub ps_information: PsInformation,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PsInformation {
    #[serde(rename = "3GPP-GGSN-MCC-MNC")]
    pub ggsn_mcc_mnc: Option<Value>,
    #[serde(rename = "Called-Station-Id")]
    pub called_station_id: Option<Value>,
    #[serde(rename = "3GPP-RAT-Type")]
    pub rat_type: Option<Value>,
    #[serde(rename = "User-Equipment-Info")]
    pub user_equipment_info: Vec<UserEquipmentInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserEquipmentInfo {
    #[serde(rename = "User-Equipment-Info-Type")]
    pub info_type: Option<String>,
    #[serde(rename = "User-Equipment-Info-Value")]
    pub info_value: Option<String>,
}

impl PsInformation {
    /// IMEI of the first equipment entry tagged `IMEI`.
    ///
    /// The first tagged entry wins even when its value is empty.
    pub fn first_imei(&self) -> Option<&str> {
        self.user_equipment_info
            .iter()
            .find(|info| info.info_type.as_deref() == Some("IMEI"))
            .and_then(|info| info.info_value.as_deref())
    }
}

// --- usage / CDR ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdrPayload {
    pub total_elements: Option<u64>,
    pub content: Vec<CdrEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CdrEntry {
    pub header: EventHeader,
    pub body: CdrBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdrBody {
    pub data_session: CdrDataSession,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdrDataSession {
    pub apn: Option<Value>,
    pub origin_country: Option<Value>,
    pub mcc: Option<Value>,
    pub mnc: Option<Value>,
    pub rat: Option<Value>,
    pub imei: Option<String>,
    pub request: CdrRequest,
    pub service_outcome: Option<Value>,
    pub usage: CdrUsage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CdrRequest {
    pub request_type: Option<Value>,
    pub request_date: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CdrUsage {
    pub uplink: Option<Counter>,
    pub downlink: Option<Counter>,
    pub total: Option<Counter>,
}

/// Byte counter as upstream sends it: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Counter {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Counter {
    pub fn to_i64(&self, field: &'static str) -> Result<i64, PayloadError> {
        match self {
            Counter::Integer(value) => Ok(*value),
            Counter::Float(value) => Ok(value.trunc() as i64),
            Counter::Text(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| PayloadError::InvalidCounter {
                    field,
                    value: raw.clone(),
                }),
        }
    }
}

// --- SIM search ---

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimSearchPayload {
    pub sims: Vec<Value>,
}

impl SimSearchPayload {
    /// Serial of the first SIM in response order. Only that entry is
    /// validated; later entries are never read.
    pub fn first_serial(self) -> Result<Option<String>, PayloadError> {
        let Some(first) = self.sims.into_iter().next() else {
            return Ok(None);
        };
        let sim: SimRecord = serde_json::from_value(first).map_err(|source| {
            PayloadError::Malformed {
                endpoint: "sim-search",
                source,
            }
        })?;
        Ok(Some(sim.sim_serial))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimRecord {
    pub sim_serial: String,
}

// --- network attach history ---

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttachHistoryPayload {
    pub total_elements: Option<u64>,
    pub content: Vec<AttachEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AttachEvent {
    pub header: EventHeader,
    pub body: AttachBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttachBody {
    pub mcc: Option<Value>,
    pub mnc: Option<Value>,
    pub operator_name: Option<Value>,
    pub iso3: Option<Value>,
    pub imei: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventHeader {
    pub event_date: Option<Value>,
    pub event_type: Option<Value>,
}
