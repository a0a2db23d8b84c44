use serde::Serialize;
use serde_json::Value;

use crate::error::PayloadError;
use crate::payload::{self, AttachEvent, AttachHistoryPayload};
use crate::summary::{self, RecordStatus, StatusDetail, UpstreamFailure};
use crate::tac::device_tac;

pub const NO_HISTORY: &str = "No location history found";

/// Which slice of the attach history the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachView {
    /// Only the first event as ordered upstream (newest first).
    LastOnly,
    All,
}

impl AttachView {
    pub fn from_last_only(last_only: bool) -> Self {
        if last_only {
            AttachView::LastOnly
        } else {
            AttachView::All
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttachSummary {
    Last(LastAttach),
    History(AttachRecords),
    NoData(StatusDetail),
    Failed(UpstreamFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAttach {
    pub status: RecordStatus,
    pub last_attach: AttachRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRecords {
    pub status: RecordStatus,
    pub total_elements: u64,
    pub records: Vec<AttachRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachRecord {
    pub event_date: Option<Value>,
    pub event_type: Option<Value>,
    pub mcc: Option<Value>,
    pub mnc: Option<Value>,
    pub operator_name: Option<Value>,
    pub country: Option<Value>,
    #[serde(rename = "deviceTAC")]
    pub device_tac: Option<String>,
}

impl From<AttachEvent> for AttachRecord {
    fn from(event: AttachEvent) -> Self {
        let body = event.body;
        Self {
            event_date: event.header.event_date,
            event_type: event.header.event_type,
            device_tac: device_tac(body.imei.as_deref()),
            mcc: body.mcc,
            mnc: body.mnc,
            operator_name: body.operator_name,
            country: body.iso3,
        }
    }
}

/// Summarize an attach-history query. Events are never re-sorted: the query
/// asks upstream for descending `eventDate`, so the first entry is the latest.
pub fn summarize(
    status: u16,
    body: &[u8],
    view: AttachView,
) -> Result<AttachSummary, PayloadError> {
    if !summary::is_success(status) {
        return Ok(AttachSummary::Failed(UpstreamFailure::from_response(
            status, body,
        )));
    }

    let payload: AttachHistoryPayload = payload::parse("network-attach", body)?;
    let mut events = payload.content.into_iter();
    let Some(first) = events.next() else {
        return Ok(AttachSummary::NoData(StatusDetail {
            status: RecordStatus::NoData,
            detail: NO_HISTORY,
        }));
    };

    match view {
        AttachView::LastOnly => Ok(AttachSummary::Last(LastAttach {
            status: RecordStatus::Ok,
            last_attach: first.into(),
        })),
        AttachView::All => {
            let records: Vec<AttachRecord> = std::iter::once(first)
                .chain(events)
                .map(AttachRecord::from)
                .collect();
            Ok(AttachSummary::History(AttachRecords {
                status: RecordStatus::Ok,
                total_elements: payload
                    .total_elements
                    .unwrap_or(records.len() as u64),
                records,
            }))
        }
    }
}

pub fn normalize(status: u16, body: &[u8], view: AttachView) -> Result<String, PayloadError> {
    summarize(status, body, view).map(|summary| summary::to_json_string(&summary))
}
