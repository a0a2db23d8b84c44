use serde_json::{Map, Value, json};
use transatel_core::error::codes;
use transatel_core::network_attach::AttachView;
use transatel_core::sim::{self, SimLookup};
use transatel_core::{cdr, data_session, network_attach};

use crate::auth::TokenProvider;
use crate::error::ToolError;
use crate::operator::OperatorClient;

pub const GET_DATA_SESSION: &str = "get_data_session";
pub const GET_NETWORK_ATTACH: &str = "get_network_attach";
pub const GET_CDR: &str = "get_cdr";

const RAT_MAPPING: &str = "RAT mapping: 1=UTRAN(3G), 2=GERAN(2G), 6=EUTRAN(4G), 11=NR(5G)";

#[derive(Debug)]
pub(crate) struct ToolDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: String,
    pub(crate) input_schema: Value,
}

fn imsi_schema(extra: Option<(&str, Value)>) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "imsi".to_string(),
        json!({ "type": "string", "description": "IMSI to query" }),
    );
    if let Some((key, schema)) = extra {
        properties.insert(key.to_string(), schema);
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["imsi"],
        "additionalProperties": false
    })
}

pub(crate) fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_DATA_SESSION,
            description: format!(
                "Check if a SIM has an ongoing data session.

Returns session status (active/inactive) with connection details.

Response format to follow:
    If active:
        \"Ongoing session: Yes
        | Started: <startTime> UTC
        | APN: <apn>
        | RAT: <ratType> (<mapped name>)
        | Network: <mcc-mnc> - <operator name> (resolve MCC-MNC to operator name)
        | Device TAC: <deviceTAC>\"
    If inactive:
        \"Ongoing session: No | No active data session found\"

{RAT_MAPPING}
Resolve MCC-MNC to operator name using your knowledge or web search.
Do not add extra commentary. State the facts only."
            ),
            input_schema: imsi_schema(None),
        },
        ToolDefinition {
            name: GET_NETWORK_ATTACH,
            description: "Get location history for a SIM card via network attach events.

Sorted by eventDate descending (most recent first).

Response format to follow:
    If last_only=true (single result):
        \"Last Location: <eventDate> UTC | Event: <eventType suffix> | Network: <mcc>-<mnc> - <operatorName> | Country: <country> | Device TAC: <deviceTAC>\"

    If last_only=false (list), present as a table:
    | Date (UTC) | Event Type | Network | Country | Device TAC |

    Column rules:
        - Network: <mcc-mnc> - <operatorName>
        - Country: iso3 code
        - Device TAC: first 8 digits of body.imei

    Then state: \"Total records: <totalElements>\"

    If no data: \"No location history found\"
    If error: \"Location query failed: <error detail>\"

Do not add extra commentary. State the facts only."
                .to_string(),
            input_schema: imsi_schema(Some((
                "last_only",
                json!({
                    "type": "boolean",
                    "default": false,
                    "description": "If true, return only the most recent location event"
                }),
            ))),
        },
        ToolDefinition {
            name: GET_CDR,
            description: format!(
                "Get network usage CDR (Call Detail Records) for a SIM card.

Returns data communication history with usage details per session.

Response format to follow:
    If records exist, present as a table:
    | Date (UTC) | APN | Network | Country | RAT | Device TAC | Upload | Download | Total |

    Column rules:
        - Network: <mcc-mnc> - <operator name> (resolve MCC-MNC to operator name)
        - Country: use originCountry code (e.g. FR, US, DE)
        - RAT: <ratType> (<mapped name>)
        - Device TAC: show raw TAC value as-is
        - Upload/Download/Total: convert bytes to human readable (KB/MB/GB)

    Then state: \"Total records: <totalElements>\"

    If no records: \"No CDR records found - SIM is inactive or has no data history\"
    If error: \"CDR query failed: <error detail>\"

{RAT_MAPPING}
Resolve MCC-MNC to operator name using web search tool.
Do not add extra commentary. State the facts only.

When asked for a graph or visual, output a single self-contained HTML file using inline CSS and vanilla JS only (no external libraries).
Unless set_brand configured other branding, brand the header as \"TRANSATEL NETWORK ANALYTICS\" and use a dark theme with these colors:
    - Background: dark navy (#0d1117 / #161b22), font: monospace
    - Normal data: cyan (#00d4ff), Anomalies: pink (#ff2d78)
    - Upload: orange (#ff6b35), Download: green (#00e5a0)
Include a branded header, KPI summary cards, relevant charts, and a detail table.
Output the full HTML inside a markdown html code block."
            ),
            input_schema: imsi_schema(None),
        },
    ]
}

/// Tool handlers: token, upstream call, normalizer, string.
#[derive(Clone, Debug)]
pub struct Toolbox {
    tokens: TokenProvider,
    operator: OperatorClient,
}

impl Toolbox {
    pub fn new(tokens: TokenProvider, operator: OperatorClient) -> Self {
        Self { tokens, operator }
    }

    pub(crate) async fn call(
        &self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<String, ToolError> {
        match name {
            GET_DATA_SESSION => self.get_data_session(&required_string(args, "imsi")?).await,
            GET_NETWORK_ATTACH => {
                let imsi = required_string(args, "imsi")?;
                let last_only = arg_bool(args, "last_only", false)?;
                self.get_network_attach(&imsi, last_only).await
            }
            GET_CDR => self.get_cdr(&required_string(args, "imsi")?).await,
            _ => Err(
                ToolError::new(codes::UNKNOWN_TOOL, format!("Unknown tool '{name}'"))
                    .with_field("name")
                    .with_docs_hint("Call tools/list for the available tools."),
            ),
        }
    }

    pub async fn get_data_session(&self, imsi: &str) -> Result<String, ToolError> {
        let token = self.tokens.acquire_token().await?;
        let response = self.operator.data_session(&token, imsi).await?;
        Ok(data_session::normalize(response.status, &response.body)?)
    }

    pub async fn get_cdr(&self, imsi: &str) -> Result<String, ToolError> {
        let token = self.tokens.acquire_token().await?;
        let response = self.operator.cdr(&token, imsi).await?;
        Ok(cdr::normalize(response.status, &response.body)?)
    }

    /// Resolves the SIM serial first; an unknown IMSI is answered in-band.
    pub async fn get_network_attach(&self, imsi: &str, last_only: bool) -> Result<String, ToolError> {
        let token = self.tokens.acquire_token().await?;
        let sim_serial = match self.operator.lookup_sim_serial(&token, imsi).await? {
            SimLookup::Found(serial) => serial,
            SimLookup::NotFound => {
                tracing::info!(event = "sim_lookup_not_found", "No SIM matched the IMSI");
                return Ok(sim::not_found_json(imsi));
            }
        };
        let response = self.operator.attach_history(&token, &sim_serial).await?;
        Ok(network_attach::normalize(
            response.status,
            &response.body,
            AttachView::from_last_only(last_only),
        )?)
    }
}

fn arg_bool(args: &Map<String, Value>, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(v)) => Ok(*v),
        Some(_) => Err(
            ToolError::new(codes::VALIDATION_FAILED, format!("'{key}' must be a boolean"))
                .with_field(key),
        ),
    }
}

fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, ToolError> {
    let value = args.get(key).ok_or_else(|| {
        ToolError::new(
            codes::VALIDATION_FAILED,
            format!("Missing required field '{key}'"),
        )
        .with_field(key)
    })?;
    match value {
        Value::String(v) if !v.trim().is_empty() => Ok(v.clone()),
        Value::String(_) => Err(ToolError::new(
            codes::VALIDATION_FAILED,
            format!("'{key}' must not be empty"),
        )
        .with_field(key)),
        _ => Err(
            ToolError::new(codes::VALIDATION_FAILED, format!("'{key}' must be a string"))
                .with_field(key),
        ),
    }
}
