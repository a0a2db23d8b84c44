use crate::error::PayloadError;
use crate::payload::{self, SimSearchPayload};
use crate::summary::{self, ErrorMessage};

/// Outcome of resolving an IMSI to its SIM serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimLookup {
    Found(String),
    NotFound,
}

impl SimLookup {
    /// Read a successful SIM-search body. When several SIMs match, the first
    /// one in response order wins.
    pub fn from_body(body: &[u8]) -> Result<Self, PayloadError> {
        let payload: SimSearchPayload = payload::parse("sim-search", body)?;
        Ok(match payload.first_serial()? {
            Some(serial) => SimLookup::Found(serial),
            None => SimLookup::NotFound,
        })
    }
}

pub fn not_found_message(imsi: &str) -> String {
    format!("No SIM found for IMSI {imsi}")
}

/// `{"error": "No SIM found for IMSI <imsi>"}`
pub fn not_found_json(imsi: &str) -> String {
    summary::to_json_string(&ErrorMessage {
        error: not_found_message(imsi),
    })
}
