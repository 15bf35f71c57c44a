use crate::action;
use crate::config::Config;
use crate::http::Context;
use crate::params::Parameters;
use crate::types::{ErrorShape, Meta, OptionItem};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::{self, Read, Write};

pub const PROTOCOL_VERSION: &str = "2025-03-01";

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data,
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

/// Host shim: one JSON-RPC request per input line, one response line each.
pub fn run_stdio_server() -> anyhow::Result<()> {
    info!(
        "Starting github-connector stdio server; protocol={}",
        PROTOCOL_VERSION
    );
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    for line in input.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(line) {
            Ok(req) => {
                debug!("Received method={}", req.method);
                dispatch(req)
            }
            Err(e) => rpc_error(None, -32700, &format!("Parse error: {}", e), None),
        };
        write_response(&resp)?;
    }
    Ok(())
}

fn write_response(resp: &Response) -> anyhow::Result<()> {
    let mut out = io::stdout();
    let payload = serde_json::to_string(resp)?;
    writeln!(out, "{}", payload)?;
    out.flush()?;
    Ok(())
}

fn dispatch(req: Request) -> Response {
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id),
        "actions/list" => handle_actions_list(req.id),
        "actions/call" => handle_actions_call(req.id, req.params),
        "options/list" => handle_options_list(req.id, req.params),
        "ping" => handle_ping(req.id, req.params),
        other => rpc_error(req.id, -32601, &format!("Method not found: {}", other), None),
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "server": {
                "name": "github-connector",
                "version": env!("CARGO_PKG_VERSION"),
                "protocol": PROTOCOL_VERSION,
            }
        }),
    )
}

fn handle_actions_list(id: Option<Id>) -> Response {
    let def = action::definition();
    let mut descriptor = match serde_json::to_value(&def) {
        Ok(v) => v,
        Err(e) => return rpc_error(id, -32603, &e.to_string(), None),
    };
    if let Some(obj) = descriptor.as_object_mut() {
        obj.insert("inputSchema".to_string(), def.input_schema());
    }
    rpc_ok(id, serde_json::json!({ "actions": [descriptor] }))
}

#[derive(Debug, Serialize, Deserialize)]
struct PingInput {
    message: Option<String>,
}

fn handle_ping(id: Option<Id>, params: Value) -> Response {
    let input: PingInput = serde_json::from_value(params).unwrap_or(PingInput { message: None });
    let message = input.message.unwrap_or_else(|| "pong".to_string());
    rpc_ok(id, serde_json::json!({ "message": message }))
}

#[derive(Deserialize)]
struct ActionCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ActionCallOutput {
    item: Option<Map<String, Value>>,
    meta: Meta,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorShape>,
}

fn handle_actions_call(id: Option<Id>, params: Value) -> Response {
    let parsed: Result<ActionCallParams, _> = serde_json::from_value(params);
    let Ok(call) = parsed else {
        return rpc_error(id, -32602, "Invalid params", None);
    };
    if call.name != action::ACTION_NAME {
        return rpc_error(id, -32601, &format!("Action not found: {}", call.name), None);
    }
    let def = action::definition();
    if let Err(e) = def.validate_arguments(&call.arguments) {
        return rpc_error(id, -32602, &e, None);
    }
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => return rpc_error(id, -32603, &e, None),
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return rpc_error(id, -32603, &e.to_string(), None),
    };
    let params = Parameters::new(call.arguments);
    let (item, meta, error) = rt.block_on(async move {
        let ctx = match Context::new(cfg) {
            Ok(c) => c,
            Err(e) => {
                return (
                    None,
                    Meta::default(),
                    Some(ErrorShape {
                        code: "server_error".into(),
                        message: e.to_string(),
                        retriable: false,
                    }),
                )
            }
        };
        action::perform(&ctx, &params).await
    });
    let out = ActionCallOutput { item, meta, error };
    match serde_json::to_value(out) {
        Ok(v) => rpc_ok(id, v),
        Err(e) => rpc_error(id, -32603, &e.to_string(), None),
    }
}

#[derive(Deserialize)]
struct OptionsListParams {
    name: String,
    property: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct OptionsListOutput {
    options: Option<Vec<OptionItem>>,
    meta: Meta,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorShape>,
}

fn handle_options_list(id: Option<Id>, params: Value) -> Response {
    let parsed: Result<OptionsListParams, _> = serde_json::from_value(params);
    let Ok(call) = parsed else {
        return rpc_error(id, -32602, "Invalid params", None);
    };
    if call.name != action::ACTION_NAME {
        return rpc_error(id, -32601, &format!("Action not found: {}", call.name), None);
    }
    let def = action::definition();
    let Some(prop) = def.property(&call.property) else {
        return rpc_error(
            id,
            -32602,
            &format!("Unknown property: {}", call.property),
            None,
        );
    };
    let Some(lookup) = prop.options_lookup else {
        return rpc_error(
            id,
            -32602,
            &format!("Property {} has no dynamic options", call.property),
            None,
        );
    };
    let repository = call
        .arguments
        .get("repository")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    if let Some(dep) = prop.options_depend_on {
        if repository.as_deref().map_or(true, |r| r.is_empty()) {
            return rpc_error(
                id,
                -32602,
                &format!("Option lookup for {} requires {}", call.property, dep),
                None,
            );
        }
    }
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => return rpc_error(id, -32603, &e, None),
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return rpc_error(id, -32603, &e.to_string(), None),
    };
    let (options, meta, error) = rt.block_on(async move {
        let ctx = match Context::new(cfg) {
            Ok(c) => c,
            Err(e) => {
                return (
                    None,
                    Meta::default(),
                    Some(ErrorShape {
                        code: "server_error".into(),
                        message: e.to_string(),
                        retriable: false,
                    }),
                )
            }
        };
        match lookup.resolve(&ctx, repository.as_deref()).await {
            Ok((options, rate)) => (Some(options), Meta { rate }, None),
            Err(e) => (None, Meta::default(), Some(e)),
        }
    });
    let out = OptionsListOutput {
        options,
        meta,
        error,
    };
    match serde_json::to_value(out) {
        Ok(v) => rpc_ok(id, v),
        Err(e) => rpc_error(id, -32603, &e.to_string(), None),
    }
}
