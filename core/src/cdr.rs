use serde::Serialize;
use serde_json::Value;

use crate::error::PayloadError;
use crate::payload::{self, CdrEntry, CdrPayload, Counter};
use crate::summary::{self, RecordStatus, UpstreamFailure};
use crate::tac::device_tac;

pub const NO_RECORDS: &str = "No CDR records found";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CdrSummary {
    Active(CdrRecords),
    Inactive(NoRecords),
    Failed(UpstreamFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoRecords {
    pub status: RecordStatus,
    pub detail: &'static str,
    pub total_elements: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdrRecords {
    pub status: RecordStatus,
    pub total_elements: u64,
    pub records: Vec<CdrRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdrRecord {
    pub event_date: Option<Value>,
    pub apn: Option<Value>,
    pub origin_country: Option<Value>,
    pub mcc: Option<Value>,
    pub mnc: Option<Value>,
    pub rat_type: Option<Value>,
    #[serde(rename = "deviceTAC")]
    pub device_tac: Option<String>,
    pub request_type: Option<Value>,
    pub request_date: Option<Value>,
    pub service_outcome: Option<Value>,
    pub usage: UsageCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageCounters {
    pub uplink: i64,
    pub downlink: i64,
    pub total: i64,
}

fn counter(value: Option<&Counter>, field: &'static str) -> Result<i64, PayloadError> {
    value.map_or(Ok(0), |counter| counter.to_i64(field))
}

impl TryFrom<CdrEntry> for CdrRecord {
    type Error = PayloadError;

    fn try_from(entry: CdrEntry) -> Result<Self, Self::Error> {
        let session = entry.body.data_session;
        let usage = UsageCounters {
            uplink: counter(session.usage.uplink.as_ref(), "uplink")?,
            downlink: counter(session.usage.downlink.as_ref(), "downlink")?,
            total: counter(session.usage.total.as_ref(), "total")?,
        };
        Ok(Self {
            event_date: entry.header.event_date,
            device_tac: device_tac(session.imei.as_deref()),
            apn: session.apn,
            origin_country: session.origin_country,
            mcc: session.mcc,
            mnc: session.mnc,
            rat_type: session.rat,
            request_type: session.request.request_type,
            request_date: session.request.request_date,
            service_outcome: session.service_outcome,
            usage,
        })
    }
}

/// Summarize a usage (CDR) query.
///
/// A missing `totalElements` counts as zero records, whatever `content` holds.
pub fn summarize(status: u16, body: &[u8]) -> Result<CdrSummary, PayloadError> {
    if !summary::is_success(status) {
        return Ok(CdrSummary::Failed(UpstreamFailure::from_response(
            status, body,
        )));
    }

    let payload: CdrPayload = payload::parse("cdr", body)?;
    let total_elements = payload.total_elements.unwrap_or(0);
    if total_elements == 0 {
        return Ok(CdrSummary::Inactive(NoRecords {
            status: RecordStatus::Inactive,
            detail: NO_RECORDS,
            total_elements: 0,
        }));
    }

    let records = payload
        .content
        .into_iter()
        .map(CdrRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CdrSummary::Active(CdrRecords {
        status: RecordStatus::Active,
        total_elements,
        records,
    }))
}

pub fn normalize(status: u16, body: &[u8]) -> Result<String, PayloadError> {
    summarize(status, body).map(|summary| summary::to_json_string(&summary))
}
