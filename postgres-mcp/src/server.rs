//! MCP method dispatch over the database context.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::context::DbContext;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use crate::resources::{self, Resource};
use crate::tools::{self, Tool};
use crate::prompts;

pub const SERVER_NAME: &str = "PostgreSQL Explorer";

pub struct McpServer {
    db: Option<DbContext>,
}

type MethodResult = Result<Value, JsonRpcError>;

impl McpServer {
    pub fn new(db: Option<DbContext>) -> Self {
        Self { db }
    }

    /// answer one request; notifications get no response
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "mcp request");

        if request.is_notification() {
            return None;
        }

        let params = match &request.params {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let result = match request.method.as_str() {
            "initialize" => Ok(initialize()),
            "ping" => Ok(json!({})),
            "resources/list" => Ok(resources::list()),
            "resources/templates/list" => Ok(resources::templates()),
            "resources/read" => self.read_resource(&params).await,
            "tools/list" => Ok(tools::list()),
            "tools/call" => self.call_tool(&params).await,
            "prompts/list" => Ok(prompts::list()),
            "prompts/get" => get_prompt(&params),
            other => Err(JsonRpcError::method_not_found(other)),
        };

        let id = request.id.unwrap_or(Value::Null);
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => {
                warn!(code = error.code, "{}", error.message);
                JsonRpcResponse::failure(id, error)
            }
        })
    }

    async fn read_resource(&self, params: &Map<String, Value>) -> MethodResult {
        let uri = string_param(params, "uri")?;
        let resource = Resource::parse(uri)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown resource: {}", uri)))?;

        let text = match resources::read(self.db.as_ref(), &resource).await {
            Ok(text) => text,
            Err(e) => e.to_string(),
        };

        Ok(json!({
            "contents": [
                {"uri": uri, "mimeType": "text/plain", "text": text}
            ]
        }))
    }

    async fn call_tool(&self, params: &Map<String, Value>) -> MethodResult {
        let name = string_param(params, "name")?;
        let arguments = object_param(params, "arguments");
        let tool = Tool::from_call(name, &arguments).map_err(JsonRpcError::invalid_params)?;

        let (text, is_error) = match tools::call(self.db.as_ref(), &tool).await {
            Ok(text) => (text, false),
            Err(e) => (e.to_string(), true),
        };

        Ok(json!({
            "content": [{"type": "text", "text": text}],
            "isError": is_error
        }))
    }
}

fn initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "resources": {},
            "tools": {},
            "prompts": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn get_prompt(params: &Map<String, Value>) -> MethodResult {
    let name = string_param(params, "name")?;
    let arguments = object_param(params, "arguments");
    prompts::get(name, &arguments).map_err(JsonRpcError::invalid_params)
}

fn string_param<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, JsonRpcError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params(format!("missing required parameter: {}", key)))
}

fn object_param(params: &Map<String, Value>, key: &str) -> Map<String, Value> {
    params
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
