pub const RESPONSE_GUIDELINES_URI: &str = "instructions://response-guidelines";

#[derive(Debug)]
pub(crate) struct ResourceDefinition {
    pub(crate) uri: &'static str,
    pub(crate) name: &'static str,
    pub(crate) description: &'static str,
    pub(crate) mime_type: &'static str,
}

pub(crate) const RESOURCES: &[ResourceDefinition] = &[ResourceDefinition {
    uri: RESPONSE_GUIDELINES_URI,
    name: "response_guidelines",
    description: "Global response rules for all Transatel MCP tool outputs",
    mime_type: "text/plain",
}];

pub fn response_guidelines() -> &'static str {
    "Global response rules for all Transatel MCP tool outputs:
- Be concise. State facts only. No filler sentences.
- Always convert RAT types: 1=UTRAN(3G), 2=GERAN(2G), 6=EUTRAN(4G), 11=NR(5G)
- Always convert bytes to human readable: B, KB, MB, GB
- All timestamps in UTC
- Never expose sensitive data: MSISDN, full IMEI, IP addresses, SIM serial
- If a tool returns an error, state it clearly and move on
- Use tables for multi-record data, single lines for single values
"
}

pub(crate) fn read_resource(uri: &str) -> Option<(&'static ResourceDefinition, &'static str)> {
    let definition = RESOURCES.iter().find(|res| res.uri == uri)?;
    let text = match definition.uri {
        RESPONSE_GUIDELINES_URI => response_guidelines(),
        _ => return None,
    };
    Some((definition, text))
}
