//! Model Context Protocol bridge.
//!
//! Exposes the application's business routes as MCP tools over a single
//! JSON-RPC 2.0 endpoint. Tool calls are dispatched in-process to a router
//! holding every route except this one.

use crate::config::{ConfigParameter, ConfigService};
use crate::controller::{Controller, HttpApp, RouteTable};
use crate::di::{Container, Injectable};
use crate::error::Result;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

pub const TAG: &str = "mcp";

/// Routes with these tags are never offered as tools.
pub const EXCLUDED_TAGS: [&str; 3] = ["actuators", "info", TAG];

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

const MAX_TOOL_RESPONSE: usize = 4 * 1024 * 1024;

/// Router that tool calls are sent to, attached once the application is composed.
#[derive(Default)]
pub struct ToolDispatcher {
    router: OnceLock<Router>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a router was already attached.
    pub fn attach(&self, router: Router) -> bool {
        self.router.set(router).is_ok()
    }

    pub fn is_attached(&self) -> bool {
        self.router.get().is_some()
    }

    pub async fn dispatch(&self, request: Request<Body>) -> Option<Response> {
        let router = self.router.get()?.clone();
        Some(
            router
                .oneshot(request)
                .await
                .unwrap_or_else(|never| match never {}),
        )
    }
}

/// A route offered as an MCP tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    #[serde(skip)]
    method: String,
    #[serde(skip)]
    path: String,
}

/// `<method>_<path segments>` relative to the prefix, e.g. `post_echo`.
pub fn tool_name(method: &str, path: &str, prefix: &str) -> String {
    let relative = path.strip_prefix(prefix).unwrap_or(path);
    let mut name = method.to_ascii_lowercase();
    let mut any = false;

    for segment in relative.split('/').filter(|s| !s.is_empty()) {
        let cleaned: String = segment
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let cleaned = cleaned.trim_matches('_');
        if !cleaned.is_empty() {
            name.push('_');
            name.push_str(cleaned);
            any = true;
        }
    }

    if !any {
        name.push_str("_root");
    }
    name
}

pub fn tools(routes: &RouteTable, prefix: &str) -> Vec<Tool> {
    routes
        .sorted()
        .into_iter()
        .filter(|route| !EXCLUDED_TAGS.contains(&route.tag.as_str()))
        .map(|route| {
            let input_schema = if route.method == Method::GET.as_str() {
                json!({"type": "object", "properties": {}})
            } else {
                json!({"type": "object", "additionalProperties": true})
            };
            Tool {
                name: tool_name(&route.method, &route.path, prefix),
                description: route.summary,
                input_schema,
                method: route.method,
                path: route.path,
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl RpcResponse {
    fn new(id: Value, outcome: std::result::Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(result) => (Some(result), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

pub struct McpController {
    config: Arc<ConfigService>,
    dispatcher: Arc<ToolDispatcher>,
}

impl Injectable for McpController {
    fn inject(container: &Container) -> Result<Self> {
        Ok(Self {
            config: container.resolve()?,
            dispatcher: container.resolve()?,
        })
    }
}

impl McpController {
    fn enabled(&self) -> bool {
        self.config
            .param_or(ConfigParameter::AppMcp, false)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not read app_mcp, MCP stays disabled");
                false
            })
    }

    fn initialize(&self) -> Value {
        let name: String = self
            .config
            .param_or(ConfigParameter::AppName, "Nanoservice".to_string())
            .unwrap_or_else(|_| "Nanoservice".to_string());
        let version: String = self
            .config
            .param_or(ConfigParameter::AppVersion, "0.1.0".to_string())
            .unwrap_or_else(|_| "0.1.0".to_string());
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {"listChanged": false}},
            "serverInfo": {"name": name, "version": version}
        })
    }

    async fn handle(
        &self,
        routes: &RouteTable,
        prefix: &str,
        body: std::result::Result<Json<Value>, JsonRejection>,
    ) -> Response {
        let value = match body {
            Ok(Json(value)) => value,
            Err(rejection) => {
                tracing::warn!(error = %rejection.body_text(), "unparseable MCP request");
                let error = RpcError::new(PARSE_ERROR, "Parse error");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(RpcResponse::new(Value::Null, Err(error))),
                )
                    .into_response();
            }
        };

        let request: RpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let error = RpcError::new(INVALID_REQUEST, format!("Invalid request: {e}"));
                return (
                    StatusCode::BAD_REQUEST,
                    Json(RpcResponse::new(Value::Null, Err(error))),
                )
                    .into_response();
            }
        };

        if request.jsonrpc != "2.0" {
            let error = RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\"");
            let id = request.id.unwrap_or(Value::Null);
            return (StatusCode::BAD_REQUEST, Json(RpcResponse::new(id, Err(error))))
                .into_response();
        }

        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "MCP notification");
            return StatusCode::ACCEPTED.into_response();
        };

        tracing::debug!(method = %request.method, "MCP request");
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({"tools": tools(routes, prefix)})),
            "tools/call" => self.call_tool(routes, prefix, request.params).await,
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        Json(RpcResponse::new(id, outcome)).into_response()
    }

    async fn call_tool(
        &self,
        routes: &RouteTable,
        prefix: &str,
        params: Value,
    ) -> std::result::Result<Value, RpcError> {
        let params: CallParams = serde_json::from_value(params)
            .map_err(|e| RpcError::new(INVALID_PARAMS, format!("Invalid params: {e}")))?;
        let tool = tools(routes, prefix)
            .into_iter()
            .find(|tool| tool.name == params.name)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("Unknown tool: {}", params.name)))?;

        let builder = Request::builder().method(tool.method.as_str()).uri(&tool.path);
        let request = if tool.method == Method::GET.as_str() {
            builder.body(Body::empty())
        } else {
            let arguments = params.arguments.unwrap_or_else(|| json!({}));
            let bytes = serde_json::to_vec(&arguments)
                .map_err(|e| RpcError::new(INVALID_PARAMS, e.to_string()))?;
            builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(bytes))
        }
        .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;

        let response = self
            .dispatcher
            .dispatch(request)
            .await
            .ok_or_else(|| RpcError::new(INTERNAL_ERROR, "Tool dispatcher is not ready"))?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), MAX_TOOL_RESPONSE)
            .await
            .map_err(|e| RpcError::new(INTERNAL_ERROR, e.to_string()))?;
        tracing::info!(tool = %tool.name, status = status.as_u16(), "MCP tool called");

        Ok(json!({
            "content": [{"type": "text", "text": String::from_utf8_lossy(&bytes)}],
            "isError": status.is_client_error() || status.is_server_error(),
        }))
    }
}

impl Controller for McpController {
    fn register_routes(self: Arc<Self>, app: &mut HttpApp, prefix: &str) -> Result<()> {
        if !self.enabled() {
            tracing::info!("MCP is disabled in configuration, skipping registration");
            return Ok(());
        }

        tracing::info!("Registering MCP routes");
        let routes = app.route_table();
        let base = prefix.to_string();
        app.post(
            format!("{prefix}/mcp"),
            "MCP Endpoint",
            TAG,
            move |body: std::result::Result<Json<Value>, JsonRejection>| {
                let this = self.clone();
                let routes = routes.clone();
                let prefix = base.clone();
                async move { this.handle(&routes, &prefix, body).await }
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::EchoController;
    use crate::service::EchoService;

    #[test]
    fn test_tool_names() {
        assert_eq!(tool_name("POST", "/echo", ""), "post_echo");
        assert_eq!(tool_name("POST", "/api/echo", "/api"), "post_echo");
        assert_eq!(tool_name("GET", "/items/{id}/full-text", ""), "get_items_id_full_text");
        assert_eq!(tool_name("GET", "/", ""), "get_root");
    }

    fn app(mcp: bool) -> (Router, Arc<ToolDispatcher>) {
        let dispatcher = Arc::new(ToolDispatcher::new());
        let mut container = Container::new();
        container
            .register(ConfigService::from_settings(
                json!({"app_mcp": mcp, "app_name": "demo"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ))
            .register(EchoService::new())
            .register_arc(dispatcher.clone());

        let mut app = HttpApp::new();
        app.get("/health", "Health Check", "actuators", || async { "ok" })
            .unwrap();
        Arc::new(EchoController::inject(&container).unwrap())
            .register_routes(&mut app, "")
            .unwrap();
        Arc::new(McpController::inject(&container).unwrap())
            .register_routes(&mut app, "")
            .unwrap();

        dispatcher.attach(app.build_router(|route| route.tag != TAG));
        (app.into_router().0, dispatcher)
    }

    async fn rpc(router: Router, body: Value) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::post("/mcp")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_disabled_registers_nothing() {
        let (router, _) = app(false);
        let (status, _) = rpc(router, json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_initialize() {
        let (router, _) = app(true);
        let (status, body) = rpc(
            router,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], json!(1));
        assert_eq!(body["result"]["protocolVersion"], json!(PROTOCOL_VERSION));
        assert_eq!(body["result"]["serverInfo"]["name"], json!("demo"));
    }

    #[tokio::test]
    async fn test_tools_list_excludes_operational_routes() {
        let (router, _) = app(true);
        let (_, body) = rpc(router, json!({"jsonrpc": "2.0", "id": "a", "method": "tools/list"})).await;
        let names: Vec<&str> = body["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["post_echo"]);
        assert_eq!(body["result"]["tools"][0]["description"], json!("Echo Endpoint"));
    }

    #[tokio::test]
    async fn test_tools_call_dispatches_in_process() {
        let (router, dispatcher) = app(true);
        assert!(dispatcher.is_attached());
        let (_, body) = rpc(
            router,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "post_echo", "arguments": {"data": {"x": 1}}}
            }),
        )
        .await;

        assert_eq!(body["result"]["isError"], json!(false));
        let text = body["result"]["content"][0]["text"].as_str().unwrap();
        let echoed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(echoed["input_data"], json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_tools_call_reports_http_errors() {
        let (router, _) = app(true);
        let (_, body) = rpc(
            router,
            json!({
                "jsonrpc": "2.0",
                "id": 8,
                "method": "tools/call",
                "params": {"name": "post_echo", "arguments": {"data": "not an object"}}
            }),
        )
        .await;
        assert_eq!(body["result"]["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_rpc_errors() {
        let (router, _) = app(true);
        let (_, body) = rpc(router.clone(), json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"})).await;
        assert_eq!(body["error"]["code"], json!(METHOD_NOT_FOUND));

        let (_, body) = rpc(
            router.clone(),
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "get_health"}}),
        )
        .await;
        assert_eq!(body["error"]["code"], json!(INVALID_PARAMS));

        let (status, body) = rpc(router, json!({"id": 4, "method": "ping"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!(INVALID_REQUEST));
    }

    #[tokio::test]
    async fn test_notification_is_accepted() {
        let (router, _) = app(true);
        let (status, body) = rpc(
            router,
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, Value::Null);
    }
}
