use serde_json::{Map, Value, json};

use crate::error::RpcError;

pub const TROUBLESHOOT_SIM: &str = "troubleshoot_sim";
pub const SET_BRAND: &str = "set_brand";

pub const DEFAULT_PRIMARY_COLOR: &str = "#00d4ff";
pub const DEFAULT_SECONDARY_COLOR: &str = "#ff6b35";
pub const DEFAULT_TERTIARY_COLOR: &str = "#00e5a0";

#[derive(Debug)]
pub(crate) struct PromptArgument {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) required: bool,
}

#[derive(Debug)]
pub(crate) struct PromptDefinition {
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) arguments: &'static [PromptArgument],
}

pub(crate) fn prompt_definitions() -> Vec<PromptDefinition> {
    vec![
        PromptDefinition {
            name: TROUBLESHOOT_SIM,
            description: "Step-by-step SIM troubleshooting: CDR, data session, then attach history, summarized in a fixed format",
            arguments: &[PromptArgument {
                name: "imsi",
                description: "IMSI of the SIM to troubleshoot",
                required: true,
            }],
        },
        PromptDefinition {
            name: SET_BRAND,
            description: "Configure company branding and colors for generated reports and visuals",
            arguments: &[
                PromptArgument {
                    name: "company_name",
                    description: "Name shown in report headers",
                    required: true,
                },
                PromptArgument {
                    name: "primary_color",
                    description: "Primary accent color (default #00d4ff)",
                    required: false,
                },
                PromptArgument {
                    name: "secondary_color",
                    description: "Secondary accent color (default #ff6b35)",
                    required: false,
                },
                PromptArgument {
                    name: "tertiary_color",
                    description: "Tertiary accent color (default #00e5a0)",
                    required: false,
                },
            ],
        },
    ]
}

impl PromptDefinition {
    pub(crate) fn to_value(&self) -> Value {
        let arguments: Vec<Value> = self
            .arguments
            .iter()
            .map(|arg| {
                json!({
                    "name": arg.name,
                    "description": arg.description,
                    "required": arg.required
                })
            })
            .collect();
        json!({
            "name": self.name,
            "description": self.description,
            "arguments": arguments
        })
    }
}

pub fn troubleshoot_sim(imsi: &str) -> String {
    format!(
        r#"You are a Transatel network troubleshooting assistant.
For IMSI: {imsi}, follow these steps IN ORDER. Do not skip steps.

STEP 1: Call get_cdr with the IMSI.
STEP 2: Call get_data_session with the IMSI.
STEP 3: Call get_network_attach with the IMSI.
STEP 4: Using ONLY the data from steps 1, 2, and 3, respond in this EXACT format:

---
## SIM Troubleshoot Summary - IMSI: {imsi}

**1. SIM Status:** Only reply in [Active / Inactive]
    - Active: if get_data_session does not report "inactive", there is an active session
    - Inactive: if get_data_session returns no active session

**2. Last Attachment:** [datetime or "No attachment found"]
    - Use the most recent eventDate from get_network_attach (first record)
    - TAC: use deviceTAC of that same event

**3. Last Data Communication:** [datetime or "No data communication found"]
    - Use get_data_session for this field
    - Use the latest eventDate from the CDR records
    - Include: APN, country (MCC/MNC), usage (total bytes), RAT type, TAC

**4. Ongoing Data Session:** [Yes / No]
    - Yes: if get_data_session returns status "active"
    - No: if get_data_session returns status "inactive"
    - If yes, include: APN, RAT type, session start time, TAC

**5. Total Data Usage:** [sum of usage.total across all CDR records]
    - Convert to human readable format (KB/MB/GB)
    - If no CDR records, state "No data usage found"

---

RULES:
- Answer ONLY these 5 points. No additional analysis.
- Use the exact format above. Do not deviate.
- Convert RAT types: 1=UTRAN(3G), 2=GERAN(2G), 6=EUTRAN(4G), 11=NR(5G)
- Convert bytes to human readable (KB/MB/GB) for usage
- All timestamps must be in UTC
- If any API call fails, state the error for that specific point and continue with the rest
"#
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub company_name: String,
    pub primary_color: String,
    pub secondary_color: String,
    pub tertiary_color: String,
}

impl Branding {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            secondary_color: DEFAULT_SECONDARY_COLOR.to_string(),
            tertiary_color: DEFAULT_TERTIARY_COLOR.to_string(),
        }
    }
}

pub fn set_brand(branding: &Branding) -> String {
    let Branding {
        company_name,
        primary_color,
        secondary_color,
        tertiary_color,
    } = branding;
    let header = company_name.to_uppercase();
    format!(
        r#"Branding for this conversation: {company_name}.

Apply this branding to every report, graph or visual you generate from the Transatel tools, replacing the default "TRANSATEL NETWORK ANALYTICS" styling.

- Header: "{header} NETWORK ANALYTICS"
- Background: dark navy (#0d1117 / #161b22), font: monospace
- Primary color (normal data, headings, KPI cards): {primary_color}
- Secondary color (upload series, highlights): {secondary_color}
- Tertiary color (download series, secondary charts): {tertiary_color}
- Anomalies: pink (#ff2d78)

Visuals must be a single self-contained HTML file with inline CSS and vanilla JS only (no external libraries), delivered inside a markdown html code block.
Confirm the branding in one sentence and wait for the next request.
"#
    )
}

/// Render `prompts/get` for a known prompt.
pub(crate) fn get_prompt(name: &str, args: &Map<String, Value>) -> Result<Value, RpcError> {
    let (description, text) = match name {
        TROUBLESHOOT_SIM => {
            let imsi = required_arg(args, "imsi")?;
            (
                "SIM troubleshooting sequence",
                troubleshoot_sim(&imsi),
            )
        }
        SET_BRAND => {
            let mut branding = Branding::new(required_arg(args, "company_name")?);
            if let Some(color) = optional_arg(args, "primary_color")? {
                branding.primary_color = color;
            }
            if let Some(color) = optional_arg(args, "secondary_color")? {
                branding.secondary_color = color;
            }
            if let Some(color) = optional_arg(args, "tertiary_color")? {
                branding.tertiary_color = color;
            }
            ("Branding configuration", set_brand(&branding))
        }
        _ => {
            return Err(RpcError::invalid_params(format!(
                "Unknown prompt '{name}'"
            )));
        }
    };

    Ok(json!({
        "description": description,
        "messages": [{
            "role": "user",
            "content": { "type": "text", "text": text }
        }]
    }))
}

fn optional_arg(args: &Map<String, Value>, key: &str) -> Result<Option<String>, RpcError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(RpcError::invalid_params(format!(
            "Prompt argument '{key}' must be a string"
        ))),
    }
}

fn required_arg(args: &Map<String, Value>, key: &str) -> Result<String, RpcError> {
    optional_arg(args, key)?.ok_or_else(|| {
        RpcError::invalid_params(format!("Missing required prompt argument '{key}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn troubleshoot_prompt_embeds_imsi_and_steps() {
        let text = troubleshoot_sim("001010123456789");
        assert!(text.contains("For IMSI: 001010123456789"));
        assert!(text.contains("SIM Troubleshoot Summary - IMSI: 001010123456789"));
        let cdr = text.find("STEP 1: Call get_cdr").expect("step 1");
        let session = text.find("STEP 2: Call get_data_session").expect("step 2");
        let attach = text.find("STEP 3: Call get_network_attach").expect("step 3");
        assert!(cdr < session && session < attach);
    }

    #[test]
    fn set_brand_uses_defaults_for_missing_colors() {
        let args = json!({ "company_name": "Acme Mobile", "secondary_color": "#123456" });
        let payload = get_prompt(SET_BRAND, args.as_object().unwrap()).expect("prompt should render");
        let text = payload["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.contains("\"ACME MOBILE NETWORK ANALYTICS\""));
        assert!(text.contains(DEFAULT_PRIMARY_COLOR));
        assert!(text.contains("#123456"));
        assert!(!text.contains(DEFAULT_SECONDARY_COLOR));
        assert!(text.contains(DEFAULT_TERTIARY_COLOR));
    }

    #[test]
    fn missing_required_argument_is_invalid_params() {
        let err = get_prompt(TROUBLESHOOT_SIM, &Map::new()).unwrap_err();
        assert_eq!(err.code, -32602);
        assert!(err.message.contains("imsi"));
    }

    #[test]
    fn unknown_prompt_is_invalid_params() {
        let err = get_prompt("summarize_everything", &Map::new()).unwrap_err();
        assert_eq!(err.code, -32602);
    }

    #[test]
    fn definitions_mark_only_company_name_required_for_branding() {
        let brand = prompt_definitions()
            .into_iter()
            .find(|prompt| prompt.name == SET_BRAND)
            .unwrap()
            .to_value();
        let required: Vec<&str> = brand["arguments"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|arg| arg["required"] == json!(true))
            .map(|arg| arg["name"].as_str().unwrap())
            .collect();
        assert_eq!(required, vec!["company_name"]);
    }
}
