//! Workings MCP Server
//!
//! JSON-RPC 2.0 over stdio, one message per line.
//!
//! Tools:
//! - calculate: Run a calculator and return its answer sheet
//! - list_calculators: List available calculators
//! - calculator_help: Documentation for one calculator, or general help
//!
//! Environment:
//! - WORKINGS_ALPHA: default significance level (0.05)
//! - WORKINGS_PRECISION: default decimal places in traces (4)
//! - RUST_LOG: log filter (info); logs go to stderr

mod protocol;

use protocol::{McpError, McpRequest, McpResponse, ToolResult};
use serde_json::{json, Value as JsonValue};
use std::env;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use workings::{CalcConfig, Renderer, StatsError, Value, Workings};

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "workings";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
enum ServerError {
    #[error("invalid {var}='{value}': {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("stdio failure: {0}")]
    Io(#[from] io::Error),
    #[error("could not encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Default calculation settings from the environment
fn config_from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<CalcConfig, ServerError> {
    let mut config = CalcConfig::default();
    if let Some(raw) = lookup("WORKINGS_ALPHA") {
        let alpha: f64 = raw.trim().parse().map_err(|e: std::num::ParseFloatError| ServerError::Env {
            var: "WORKINGS_ALPHA",
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        config = config.with_alpha(alpha).map_err(|e| ServerError::Env {
            var: "WORKINGS_ALPHA",
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    if let Some(raw) = lookup("WORKINGS_PRECISION") {
        let precision: i64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| ServerError::Env {
            var: "WORKINGS_PRECISION",
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        config = config.with_precision(precision).map_err(|e| ServerError::Env {
            var: "WORKINGS_PRECISION",
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(config)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

fn run() -> Result<(), ServerError> {
    let config = config_from_env(|var| env::var(var).ok())?;
    let workings = Workings::with_standard_library().with_config(config);

    tracing::info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Workings MCP server started");
    tracing::info!(
        alpha = config.alpha,
        precision = config.precision,
        calculators = workings.registry().len(),
        "configuration loaded"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&workings, stdin.lock(), stdout.lock())?;

    tracing::info!("server shutting down");
    Ok(())
}

/// Line-oriented request loop; returns on EOF.
fn serve(workings: &Workings, mut reader: impl BufRead, mut writer: impl Write) -> Result<(), ServerError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            tracing::info!("client disconnected (EOF)");
            return Ok(());
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let request: McpRequest = match serde_json::from_str(message) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                write_response(&mut writer, &McpResponse::err(None, McpError::parse_error(e)))?;
                continue;
            }
        };

        tracing::debug!(method = %request.method, "processing");
        let response = handle_request(workings, &request);

        // Notifications (no id) get no response
        if request.id.is_none() {
            tracing::debug!(method = %request.method, "notification processed");
            continue;
        }
        write_response(&mut writer, &response)?;
    }
}

fn write_response(writer: &mut impl Write, response: &McpResponse) -> Result<(), ServerError> {
    let encoded = serde_json::to_string(response)?;
    writeln!(writer, "{}", encoded)?;
    writer.flush()?;
    Ok(())
}

fn handle_request(workings: &Workings, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "notifications/initialized" | "initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => Ok(handle_tools_list()),
        "tools/call" => handle_tool_call(workings, &request.params),

        _ => Err(McpError::method_not_found(&request.method)),
    };

    match result {
        Ok(r) => McpResponse::ok(request.id.clone(), r),
        Err(e) => McpResponse::err(request.id.clone(), e),
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client = params
        .as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Echo the client's protocol version for compatibility
    let client_protocol = params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    tracing::info!(client, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Statistics calculators that show their working"
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        }
    }))
}

fn handle_tools_list() -> JsonValue {
    json!({
        "tools": [
            {
                "name": "calculate",
                "description": "Run a statistics calculator. Returns a markdown answer sheet with every step of the working, plus the structured result.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "calculator": {
                            "type": "string",
                            "description": "Calculator name, e.g. one_way_anova, t_test_paired, chi_square_independence"
                        },
                        "inputs": {
                            "type": "object",
                            "description": "Named arguments for the calculator (see calculator_help)"
                        },
                        "alpha": {
                            "type": "number",
                            "description": "Significance level for this call"
                        },
                        "tails": {
                            "description": "1/upper, lower, or 2/two"
                        },
                        "precision": {
                            "type": "integer",
                            "description": "Decimal places in the working (0-12)"
                        }
                    },
                    "required": ["calculator", "inputs"]
                }
            },
            {
                "name": "list_calculators",
                "description": "List available calculators, optionally by category.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": {
                            "type": "string",
                            "description": "Filter by category",
                            "enum": ["anova", "t_tests", "chi_square", "distributions", "descriptive", "regression", "tables"]
                        }
                    }
                }
            },
            {
                "name": "calculator_help",
                "description": "Arguments, usage and examples for a calculator. Omit the name for an overview.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Calculator name"
                        }
                    }
                }
            }
        ]
    })
}

fn handle_tool_call(workings: &Workings, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params
        .as_ref()
        .ok_or_else(|| McpError::invalid_params("Missing params"))?;
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    let result = match name {
        "calculate" => tool_calculate(workings, &args)?,
        "list_calculators" => tool_list_calculators(workings, &args),
        "calculator_help" => tool_calculator_help(workings, &args),
        _ => return Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    };
    serde_json::to_value(result).map_err(|e| McpError::invalid_params(e.to_string()))
}

fn tool_calculate(workings: &Workings, args: &JsonValue) -> Result<ToolResult, McpError> {
    let calculator = args
        .get("calculator")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing calculator argument"))?;

    let mut inputs = match args.get("inputs") {
        Some(JsonValue::Object(map)) => map.clone(),
        None | Some(JsonValue::Null) => serde_json::Map::new(),
        Some(_) => return Err(McpError::invalid_params("inputs must be an object")),
    };
    // Top-level settings apply to this call only
    for key in ["alpha", "tails", "precision"] {
        if let Some(v) = args.get(key) {
            inputs.insert(key.to_string(), v.clone());
        }
    }

    match workings.calculate_json(calculator, &JsonValue::Object(inputs)) {
        Ok(answer) => {
            tracing::info!(calculator, steps = answer.result.steps.len(), "calculated");
            let structured = serde_json::to_value(&answer.result).unwrap_or(JsonValue::Null);
            Ok(ToolResult::text(answer.markdown).with_structured(structured))
        }
        Err(e) => {
            tracing::info!(calculator, code = %e.code, "calculation rejected");
            Ok(calculation_error(calculator, &e))
        }
    }
}

fn calculation_error(calculator: &str, error: &StatsError) -> ToolResult {
    let text = Renderer::new().render_error(calculator, error);
    let structured = serde_json::to_value(error).unwrap_or(JsonValue::Null);
    ToolResult::error(text).with_structured(json!({ "error": structured }))
}

fn tool_list_calculators(workings: &Workings, args: &JsonValue) -> ToolResult {
    let category = args.get("category").and_then(|v| v.as_str());
    let list = workings.list_calculators(category);
    let mut text = String::from("| name | category | usage |\n|------|----------|-------|\n");
    if let Value::List(items) = &list {
        for item in items {
            let field = |k: &str| item.get(k).and_then(Value::as_text).unwrap_or("").to_string();
            text.push_str(&format!("| {} | {} | `{}` |\n", field("name"), field("category"), field("usage")));
        }
    }
    ToolResult::text(text).with_structured(json!({ "calculators": list.to_json() }))
}

fn tool_calculator_help(workings: &Workings, args: &JsonValue) -> ToolResult {
    let name = args.get("name").and_then(|v| v.as_str());
    match workings.help(name) {
        Ok(help) => ToolResult::text(format_help(&help)).with_structured(help.to_json()),
        Err(e) => calculation_error(name.unwrap_or("help"), &e),
    }
}

fn format_help(help: &Value) -> String {
    let Value::Object(map) = help else {
        return help.to_string();
    };
    let mut out = String::new();
    if let Some(Value::Text(n)) = map.get("name") {
        out.push_str(&format!("# {}\n\n", n));
    }
    if let Some(Value::Text(d)) = map.get("description") {
        out.push_str(&format!("{}\n\n", d));
    }
    if let Some(Value::Text(u)) = map.get("usage") {
        out.push_str(&format!("**Usage:** `{}`\n\n", u));
    }
    if let Some(Value::List(args)) = map.get("args") {
        out.push_str("| arg | type | description |\n|-----|------|-------------|\n");
        for arg in args {
            let field = |k: &str| arg.get(k).and_then(Value::as_text).unwrap_or("").to_string();
            let optional = if arg.get("optional").and_then(Value::as_bool) == Some(true) { "?" } else { "" };
            out.push_str(&format!("| {}{} | {} | {} |\n", field("name"), optional, field("type"), field("description")));
        }
        out.push('\n');
    }
    if let Some(Value::List(examples)) = map.get("examples") {
        for example in examples {
            out.push_str(&format!("- `{}`\n", example));
        }
    }
    if let Some(Value::Object(categories)) = map.get("calculators") {
        for (category, names) in categories {
            out.push_str(&format!("**{}:** {}\n\n", category, names));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    fn exchange(input: &str) -> Vec<JsonValue> {
        let workings = Workings::with_standard_library();
        let mut output = Vec::new();
        serve(&workings, Cursor::new(input.as_bytes()), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn call(tool: &str, arguments: JsonValue) -> JsonValue {
        let request = json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {"name": tool, "arguments": arguments}
        });
        exchange(&format!("{}\n", request)).remove(0)
    }

    #[test]
    fn test_initialize_and_notification() {
        let responses = exchange(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        ));
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2025-06-18");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "workings");
        assert_eq!(responses[1]["id"], 2);
    }

    #[test]
    fn test_parse_error_and_unknown_method() {
        let responses = exchange("not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"nope\"}\n");
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], 7);
    }

    #[test]
    fn test_tools_list() {
        let responses = exchange("{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n");
        let names: Vec<&str> = responses[0]["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["calculate", "list_calculators", "calculator_help"]);
    }

    #[test]
    fn test_calculate() {
        let response = call(
            "calculate",
            json!({"calculator": "one_way_anova", "inputs": {"groups": [[1, 2, 3], [4, 5, 6], [7, 8, 9]]}}),
        );
        let result = &response["result"];
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("**Answer:** Reject H₀"));
        assert_eq!(result["structuredContent"]["value"]["f_stat"], 27.0);
    }

    #[test]
    fn test_calculate_applies_top_level_settings() {
        let response = call(
            "calculate",
            json!({"calculator": "t_test_one_sample", "inputs": {"data": [10, 12, 14, 16, 18], "mu": 6}, "tails": 1}),
        );
        assert_eq!(response["result"]["structuredContent"]["value"]["critical_value"], 2.132);
    }

    #[test]
    fn test_calculation_error_is_tool_error() {
        let response = call("calculate", json!({"calculator": "one_way_anova", "inputs": {"groups": [[1, 2]]}}));
        let result = &response["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["error"]["code"], "INSUFFICIENT_GROUPS");
    }

    #[test]
    fn test_missing_calculator_is_invalid_params() {
        let response = call("calculate", json!({"inputs": {}}));
        assert_eq!(response["error"]["code"], -32602);
    }

    #[test]
    fn test_help_and_list_tools() {
        let help = call("calculator_help", json!({"name": "box_plot"}));
        let text = help["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("# box_plot"));
        assert!(text.contains("| data |"));

        let list = call("list_calculators", json!({"category": "anova"}));
        assert_eq!(list["result"]["structuredContent"]["calculators"].as_array().unwrap().len(), 2);

        let unknown = call("calculator_help", json!({"name": "nope"}));
        assert_eq!(unknown["result"]["isError"], true);
    }

    #[test]
    fn test_config_from_env() {
        let vars: HashMap<&str, &str> = [("WORKINGS_ALPHA", "0.01"), ("WORKINGS_PRECISION", "2")].into();
        let config = config_from_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.precision, 2);

        let defaults = config_from_env(|_| None).unwrap();
        assert_eq!(defaults, CalcConfig::default());

        assert!(matches!(
            config_from_env(|k| (k == "WORKINGS_ALPHA").then(|| "1.5".to_string())),
            Err(ServerError::Env { var: "WORKINGS_ALPHA", .. })
        ));
        assert!(config_from_env(|k| (k == "WORKINGS_PRECISION").then(|| "lots".to_string())).is_err());
    }
}
