use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

pub mod auth;
pub mod config;
mod error;
pub mod operator;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use config::{OperatorArgs, OperatorConfig};
pub use error::ToolError;
pub use tools::Toolbox;

use auth::TokenProvider;
use error::RpcError;
use operator::OperatorClient;

pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub const MCP_SERVER_NAME: &str = "transatel-mcp";

/// MCP request dispatcher. Cheap to clone; every transport session shares one.
#[derive(Clone, Debug)]
pub struct McpServer {
    toolbox: Toolbox,
}

impl McpServer {
    /// Fails only when the TLS backend of the shared HTTP client cannot be
    /// initialized.
    pub fn new(config: Arc<OperatorConfig>) -> Result<Self, reqwest::Error> {
        let http = operator::client()?;
        let operator = OperatorClient::new(config.api_url.clone(), http.clone());
        let tokens = TokenProvider::new(config, http);
        Ok(Self::with_toolbox(Toolbox::new(tokens, operator)))
    }

    pub fn with_toolbox(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }

    pub fn toolbox(&self) -> &Toolbox {
        &self.toolbox
    }

    /// Handle one decoded JSON-RPC message or batch. Notifications and client
    /// responses produce no output.
    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // Client response; this server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        match obj.get("id").cloned() {
            Some(id) => {
                let result = self.handle_request(method, params).await;
                Some(match result {
                    Ok(payload) => success_response(id, payload),
                    Err(err) => error_response(id, err),
                })
            }
            None => {
                tracing::debug!(event = "mcp_notification", method, "MCP notification ignored");
                None
            }
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(prompts_list_payload()),
            "prompts/get" => handle_prompts_get(params),
            "resources/list" => Ok(resources_list_payload()),
            "resources/templates/list" => Ok(json!({ "resourceTemplates": [] })),
            "resources/read" => handle_resources_read(params),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let started = Instant::now();
        let result = self.toolbox.call(name, &args).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        Ok(match result {
            Ok(text) => {
                tracing::info!(
                    event = "mcp_tool_call",
                    tool = name,
                    outcome = "ok",
                    elapsed_ms,
                    "MCP tool call completed"
                );
                build_tool_call_response(text)
            }
            Err(err) => {
                tracing::warn!(
                    event = "mcp_tool_call",
                    tool = name,
                    outcome = "error",
                    error_code = %err.code,
                    error_message = %err.message,
                    elapsed_ms,
                    "MCP tool call failed"
                );
                build_tool_error_response(&err)
            }
        })
    }

    /// Serve over stdin/stdout until EOF. Replies use the framing of the
    /// request they answer.
    pub async fn serve_stdio(&self) -> Result<(), String> {
        let mut reader = BufReader::new(io::stdin());
        let mut stdout = io::stdout();

        loop {
            let incoming = read_message(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some((decoded, framing)) = incoming else {
                break;
            };

            let responses = match decoded {
                Ok(message) => self.handle_incoming_message(message).await,
                Err(err) => {
                    tracing::warn!(event = "mcp_parse_error", error = %err, "Invalid JSON on stdin");
                    vec![parse_error_response()]
                }
            };
            for response in responses {
                write_message(&mut stdout, &response, framing)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        Ok(())
    }
}

/// Entry point for the stdio binary. Returns the process exit code.
pub async fn run_stdio(config: OperatorConfig) -> i32 {
    let server = match McpServer::new(Arc::new(config)) {
        Ok(server) => server,
        Err(err) => {
            tracing::error!(event = "http_client_failed", error = %err, "Failed to build HTTP client");
            return 1;
        }
    };
    tracing::info!(
        event = "mcp_stdio_started",
        server = MCP_SERVER_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "MCP server listening on stdio"
    );
    match server.serve_stdio().await {
        Ok(()) => 0,
        Err(err) => {
            let payload = json!({
                "error": "mcp_server_error",
                "message": err,
            });
            eprintln!("{}", to_pretty_json(&payload));
            1
        }
    }
}

fn initialize_payload() -> Value {
    json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "subscribe": false, "listChanged": false },
            "prompts": { "listChanged": false }
        },
        "serverInfo": {
            "name": MCP_SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": format!(
            "Transatel network tools keyed by IMSI: get_data_session, get_cdr, get_network_attach. Tool results are JSON; narrate them following each tool's response format and the {} resource. Use the troubleshoot_sim prompt for a full SIM diagnosis.",
            resources::RESPONSE_GUIDELINES_URI
        )
    })
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tools::tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn prompts_list_payload() -> Value {
    let prompts: Vec<Value> = prompts::prompt_definitions()
        .iter()
        .map(|prompt| prompt.to_value())
        .collect();
    json!({ "prompts": prompts })
}

fn handle_prompts_get(params: Value) -> Result<Value, RpcError> {
    let params = params
        .as_object()
        .ok_or_else(|| RpcError::invalid_params("prompts/get params must be an object"))?;
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("prompts/get requires string field 'name'"))?;
    let args = match params.get("arguments") {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(_) => {
            return Err(RpcError::invalid_params(
                "prompts/get 'arguments' must be an object",
            ));
        }
    };
    prompts::get_prompt(name, &args)
}

fn resources_list_payload() -> Value {
    let resources: Vec<Value> = resources::RESOURCES
        .iter()
        .map(|res| {
            json!({
                "uri": res.uri,
                "name": res.name,
                "description": res.description,
                "mimeType": res.mime_type
            })
        })
        .collect();
    json!({ "resources": resources })
}

fn handle_resources_read(params: Value) -> Result<Value, RpcError> {
    let params = params
        .as_object()
        .ok_or_else(|| RpcError::invalid_params("resources/read params must be an object"))?;
    let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| {
        RpcError::invalid_params("resources/read requires string field 'uri'")
    })?;

    let (definition, text) = resources::read_resource(uri)
        .ok_or_else(|| RpcError::invalid_params(format!("Unknown resource uri '{uri}'")))?;

    Ok(json!({
        "contents": [{
            "uri": definition.uri,
            "mimeType": definition.mime_type,
            "text": text
        }]
    }))
}

fn build_tool_call_response(text: String) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }]
    })
}

fn build_tool_error_response(err: &ToolError) -> Value {
    json!({
        "isError": true,
        "content": [{ "type": "text", "text": err.message }],
        "structuredContent": err.to_value()
    })
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

/// JSON-RPC answer for a body that is not JSON at all.
pub fn parse_error_response() -> Value {
    error_response(Value::Null, RpcError::parse_error())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    /// `Content-Length` headers followed by the JSON body
    ContentLength,
    /// One JSON document per line
    NewlineDelimited,
}

type DecodedMessage = (Result<Value, serde_json::Error>, Framing);

async fn read_message<R>(reader: &mut R) -> Result<Option<DecodedMessage>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }

        // Outside a header block anything that is not `Name: value` is an
        // NDJSON message, so stray text is answered with a parse error.
        if content_length.is_none() && !is_header_line(line) {
            return Ok(Some((
                serde_json::from_str(line),
                Framing::NewlineDelimited,
            )));
        }

        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    Ok(Some((
        serde_json::from_slice(&payload),
        Framing::ContentLength,
    )))
}

fn is_header_line(line: &str) -> bool {
    if line.trim_start().starts_with(['{', '[']) {
        return false;
    }
    line.split_once(':').is_some_and(|(name, _)| {
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

async fn write_message<W>(writer: &mut W, value: &Value, framing: Framing) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::NewlineDelimited => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_server() -> McpServer {
        let config = OperatorArgs {
            access_token_url: "http://127.0.0.1:9/oauth/token".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            scope: "network:read".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
        }
        .into_config()
        .expect("config should build");
        McpServer::new(Arc::new(config)).expect("server should build")
    }

    async fn request(server: &McpServer, method: &str, params: Value) -> Value {
        let mut responses = server
            .handle_incoming_message(json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": method,
                "params": params
            }))
            .await;
        assert_eq!(responses.len(), 1, "request should produce exactly one response");
        responses.remove(0)
    }

    #[tokio::test]
    async fn initialize_reports_server_info_and_capabilities() {
        let response = request(&offline_server(), "initialize", json!({})).await;
        assert_eq!(response["id"], 7);
        let result = &response["result"];
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], MCP_SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["prompts"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn tools_list_exposes_three_tools() {
        let response = request(&offline_server(), "tools/list", Value::Null).await;
        let names: Vec<&str> = response["result"]["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["get_data_session", "get_network_attach", "get_cdr"]);
    }

    #[tokio::test]
    async fn prompts_get_renders_troubleshooting_sequence() {
        let response = request(
            &offline_server(),
            "prompts/get",
            json!({ "name": "troubleshoot_sim", "arguments": { "imsi": "001010123456789" } }),
        )
        .await;
        let text = response["result"]["messages"][0]["content"]["text"]
            .as_str()
            .expect("prompt text");
        assert!(text.contains("For IMSI: 001010123456789"));
        assert_eq!(response["result"]["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn prompts_list_names_both_prompts() {
        let response = request(&offline_server(), "prompts/list", Value::Null).await;
        let names: Vec<&str> = response["result"]["prompts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|prompt| prompt["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["troubleshoot_sim", "set_brand"]);
    }

    #[tokio::test]
    async fn resources_read_returns_guidelines_text() {
        let response = request(
            &offline_server(),
            "resources/read",
            json!({ "uri": "instructions://response-guidelines" }),
        )
        .await;
        let content = &response["result"]["contents"][0];
        assert_eq!(content["mimeType"], "text/plain");
        assert!(content["text"].as_str().unwrap().starts_with("Global response rules"));
    }

    #[tokio::test]
    async fn unknown_resource_is_invalid_params() {
        let response = request(
            &offline_server(),
            "resources/read",
            json!({ "uri": "instructions://missing" }),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = request(&offline_server(), "sampling/createMessage", json!({})).await;
        assert_eq!(response["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn notifications_and_empty_batches() {
        let server = offline_server();
        let responses = server
            .handle_incoming_message(json!({
                "jsonrpc": "2.0",
                "method": "notifications/initialized"
            }))
            .await;
        assert!(responses.is_empty());

        let responses = server.handle_incoming_message(json!([])).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn batch_answers_each_request() {
        let responses = offline_server()
            .handle_incoming_message(json!([
                { "jsonrpc": "2.0", "id": 1, "method": "ping" },
                { "jsonrpc": "2.0", "method": "notifications/initialized" },
                { "jsonrpc": "2.0", "id": 2, "method": "tools/list" }
            ]))
            .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn wrong_jsonrpc_version_is_invalid_request() {
        let responses = offline_server()
            .handle_incoming_message(json!({ "jsonrpc": "1.0", "id": 3, "method": "ping" }))
            .await;
        assert_eq!(responses[0]["id"], 3);
        assert_eq!(responses[0]["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn tool_argument_errors_are_tool_results() {
        let response = request(
            &offline_server(),
            "tools/call",
            json!({ "name": "get_cdr", "arguments": {} }),
        )
        .await;
        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"], "validation_failed");
        assert_eq!(result["structuredContent"]["field"], "imsi");
    }

    #[tokio::test]
    async fn unknown_tool_is_a_tool_error() {
        let response = request(
            &offline_server(),
            "tools/call",
            json!({ "name": "get_balance", "arguments": { "imsi": "1" } }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["structuredContent"]["error"], "unknown_tool");
    }

    #[tokio::test]
    async fn unreachable_token_endpoint_fails_the_call() {
        let response = request(
            &offline_server(),
            "tools/call",
            json!({ "name": "get_data_session", "arguments": { "imsi": "001010123456789" } }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["structuredContent"]["error"], "auth_failed");
    }

    #[tokio::test]
    async fn read_message_accepts_both_framings() {
        let input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\nContent-Length: 33\r\n\r\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}";
        let mut reader = BufReader::new(&input[..]);

        let (first, framing) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::NewlineDelimited);
        assert_eq!(first.unwrap()["id"], 1);

        let (second, framing) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::ContentLength);
        assert_eq!(second.unwrap()["method"], "ping");

        assert!(read_message(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_message_reports_invalid_json_without_failing() {
        let mut reader = BufReader::new(&b"{not json}\n"[..]);
        let (decoded, _) = read_message(&mut reader).await.unwrap().unwrap();
        assert!(decoded.is_err());
        assert_eq!(parse_error_response()["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn stray_text_line_is_a_parse_error() {
        let input = b"hello\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let mut reader = BufReader::new(&input[..]);

        let (decoded, framing) = read_message(&mut reader).await.unwrap().unwrap();
        assert!(decoded.is_err());
        assert_eq!(framing, Framing::NewlineDelimited);

        let (next, framing) = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(framing, Framing::ContentLength);
        assert_eq!(next.unwrap(), json!({}));
    }

    #[test]
    fn header_lines_are_told_apart_from_payloads() {
        assert!(is_header_line("Content-Length: 12"));
        assert!(is_header_line("content-type: application/json"));
        assert!(!is_header_line("hello"));
        assert!(!is_header_line("not a header: value"));
        assert!(!is_header_line(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn write_message_newline_framing() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({ "ok": true }), Framing::NewlineDelimited)
            .await
            .unwrap();
        assert_eq!(out, b"{\"ok\":true}\n");

        let mut out = Vec::new();
        write_message(&mut out, &json!({ "ok": true }), Framing::ContentLength)
            .await
            .unwrap();
        assert_eq!(out, b"Content-Length: 11\r\nContent-Type: application/json\r\n\r\n{\"ok\":true}");
    }
}
