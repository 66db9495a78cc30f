//! MCP protocol types.
//!
//! Only the slice of the JSON-RPC based MCP protocol needed to identify a
//! server and enumerate its tools: `initialize` and `tools/list`.
//! See: <https://spec.modelcontextprotocol.io/>

use crate::error::{McpError, McpResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version sent during initialization.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default client name announced to servers.
pub const CLIENT_NAME: &str = "mcp-catalog";

/// Default client version announced to servers.
pub const CLIENT_VERSION: &str = "1.0.0";

/// The two methods a probe issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    ToolsList,
}

impl RpcMethod {
    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::Initialize => "initialize",
            RpcMethod::ToolsList => "tools/list",
        }
    }

    /// Fixed request id. A probe has at most one of each in flight.
    pub fn id(&self) -> u64 {
        match self {
            RpcMethod::Initialize => 1,
            RpcMethod::ToolsList => 2,
        }
    }

    /// Build the request for this method.
    pub fn request(&self, client_info: &Implementation) -> JsonRpcRequest {
        let params = match self {
            RpcMethod::Initialize => InitializeParams::new(client_info.clone()).into_value(),
            RpcMethod::ToolsList => Value::Object(serde_json::Map::new()),
        };
        JsonRpcRequest::new(self.id(), self.as_str(), params)
    }
}

/// JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC request.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response.
///
/// Servers echo the id in whatever form they like, so it is kept loose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Parse a response body.
    pub fn parse(body: &str) -> McpResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| McpError::MalformedResponse(format!("not a JSON-RPC response: {e}")))
    }

    /// Whether this response answers the request with the given id.
    /// Accepts `1` and `"1"`.
    pub fn answers(&self, id: u64) -> bool {
        match &self.id {
            Value::Number(n) => n.as_u64() == Some(id),
            Value::String(s) => s.parse::<u64>().ok() == Some(id),
            _ => false,
        }
    }

    /// Collapse into the success payload or the peer's error.
    pub fn into_result(self) -> McpResult<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(McpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(McpError::MalformedResponse(
                "response has neither result nor error".to_string(),
            )),
        }
    }
}

/// JSON-RPC error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP initialization parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

impl InitializeParams {
    pub fn new(client_info: Implementation) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info,
        }
    }

    fn into_value(self) -> Value {
        serde_json::json!({
            "protocolVersion": self.protocol_version,
            "capabilities": self.capabilities,
            "clientInfo": self.client_info,
        })
    }
}

/// Client capabilities announced during initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub roots: RootsCapability,
    pub sampling: SamplingCapability,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            roots: RootsCapability { list_changed: true },
            sampling: SamplingCapability {},
        }
    }
}

/// Roots capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    pub list_changed: bool,
}

/// Sampling capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingCapability {}

/// Name and version of a client or server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

impl Default for Implementation {
    fn default() -> Self {
        Self::new(CLIENT_NAME, CLIENT_VERSION)
    }
}

/// MCP initialization result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub server_info: Implementation,
}

impl InitializeResult {
    /// Decode the `result` payload of an initialize response.
    pub fn from_value(value: Value) -> McpResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| McpError::MalformedResponse(format!("invalid initialize result: {e}")))
    }
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Tool description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }
}

/// List tools result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
}

impl ListToolsResult {
    /// Decode the `result` payload of a tools/list response.
    pub fn from_value(value: Value) -> McpResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| McpError::MalformedResponse(format!("invalid tools/list result: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initialize_request_shape() {
        let req = RpcMethod::Initialize.request(&Implementation::default());
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 1);
        assert_eq!(json["method"], "initialize");
        assert_eq!(json["params"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(json["params"]["capabilities"]["roots"]["listChanged"], true);
        assert_eq!(json["params"]["capabilities"]["sampling"], json!({}));
        assert_eq!(json["params"]["clientInfo"]["name"], "mcp-catalog");
        assert_eq!(json["params"]["clientInfo"]["version"], "1.0.0");
    }

    #[test]
    fn test_tools_list_request_shape() {
        let req = RpcMethod::ToolsList.request(&Implementation::default());
        assert_eq!(req.id, 2);
        assert_eq!(req.method, "tools/list");
        assert_eq!(req.params, json!({}));
    }

    #[test]
    fn test_response_error_wins() {
        let resp = JsonRpcResponse::parse(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not found"}}"#,
        )
        .unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "MCP error: Method not found (-32601)");
    }

    #[test]
    fn test_response_without_result_is_malformed() {
        let resp = JsonRpcResponse::parse(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(matches!(
            resp.into_result(),
            Err(McpError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_response_parse_rejects_html() {
        let err = JsonRpcResponse::parse("<html>nope</html>").unwrap_err();
        assert!(matches!(err, McpError::MalformedResponse(_)));
    }

    #[test]
    fn test_answers_numeric_and_string_ids() {
        let numeric = JsonRpcResponse::parse(r#"{"id":2,"result":{}}"#).unwrap();
        let string = JsonRpcResponse::parse(r#"{"id":"2","result":{}}"#).unwrap();
        assert!(numeric.answers(2));
        assert!(string.answers(2));
        assert!(!numeric.answers(1));
    }

    #[test]
    fn test_initialize_result_without_version() {
        let result = InitializeResult::from_value(json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {"name": "S"}
        }))
        .unwrap();
        assert_eq!(result.server_info.name, "S");
        assert!(result.server_info.version.is_none());
    }

    #[test]
    fn test_list_tools_preserves_order() {
        let result = ListToolsResult::from_value(json!({
            "tools": [
                {"name": "b", "inputSchema": {"type": "object"}},
                {"name": "a", "description": "first letter"}
            ]
        }))
        .unwrap();
        let names: Vec<_> = result.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(result.tools[0].input_schema.is_some());
    }

    #[test]
    fn test_list_tools_missing_array_is_empty() {
        let result = ListToolsResult::from_value(json!({})).unwrap();
        assert!(result.tools.is_empty());
    }
}
