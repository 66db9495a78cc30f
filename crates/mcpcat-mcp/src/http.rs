//! HTTP request engine for a single MCP JSON-RPC call.
//!
//! Redirects are followed by hand so the engine can report the URL that
//! actually answered. A 406 from the server switches the call to one of two
//! fallback modes, chosen by what the rejection body asks for:
//!
//! - `text/event-stream`: open an SSE stream and synthesize a result without
//!   reading any events
//! - anything else: retry as a GET with the request JSON in the query string

use crate::error::{duration_ms, McpError, McpResult};
use crate::protocol::{Implementation, JsonRpcResponse, RpcMethod, PROTOCOL_VERSION};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, LOCATION};
use reqwest::{redirect, Client, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default number of redirects followed before giving up.
pub const DEFAULT_MAX_REDIRECTS: usize = 3;

/// Name reported for servers that only speak SSE.
pub const SSE_SERVER_NAME: &str = "SSE MCP Server";

const EVENT_STREAM: &str = "text/event-stream";

/// Outcome of one call: the URL that ended the chain plus the result.
#[derive(Debug)]
pub struct Exchange {
    pub final_url: Url,
    pub result: McpResult<Value>,
}

impl Exchange {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// How a response status steers the redirect loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Redirect,
    NotAcceptable,
    Failure,
    Success,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        match status.as_u16() {
            301 | 302 | 307 | 308 => Self::Redirect,
            406 => Self::NotAcceptable,
            _ if status.is_success() => Self::Success,
            _ => Self::Failure,
        }
    }
}

/// Wire mode used for the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// POST with a JSON body (the initial attempt).
    Json,
    /// Server wants an SSE stream.
    Sse,
    /// Retry as GET with the request in the query string.
    GetFallback,
}

impl ResponseMode {
    /// Pick a fallback from the body of a 406 response.
    pub fn negotiate(body: &str) -> Self {
        if body.contains(EVENT_STREAM) {
            Self::Sse
        } else {
            Self::GetFallback
        }
    }
}

/// Result fabricated for SSE-only servers, which are never actually read.
pub fn synthesized_result(method: RpcMethod) -> Value {
    match method {
        RpcMethod::Initialize => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": true } },
            "serverInfo": { "name": SSE_SERVER_NAME, "version": "1.0.0" }
        }),
        RpcMethod::ToolsList => json!({ "tools": [] }),
    }
}

enum PostReply {
    Done(Value),
    Negotiate(ResponseMode),
}

/// Performs MCP calls over plain HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    client_info: Implementation,
    max_redirects: usize,
}

impl HttpEngine {
    /// Create an engine. Automatic redirects are disabled on the client.
    pub fn new(client_info: Implementation, max_redirects: usize) -> McpResult<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| McpError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            client_info,
            max_redirects,
        })
    }

    pub fn client_info(&self) -> &Implementation {
        &self.client_info
    }

    /// Run one JSON-RPC call against `url` within `budget`.
    ///
    /// The returned `final_url` is the last URL contacted, which differs from
    /// `url` only when a redirect was followed.
    pub async fn perform(&self, url: &Url, method: RpcMethod, budget: Duration) -> Exchange {
        let mut current = url.clone();
        let outcome = tokio::time::timeout(budget, self.exchange(&mut current, method, budget)).await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                debug!(url = %current, method = method.as_str(), "MCP request timed out");
                Err(McpError::Timeout(duration_ms(budget)))
            }
        };

        Exchange {
            final_url: current,
            result,
        }
    }

    async fn exchange(
        &self,
        current: &mut Url,
        method: RpcMethod,
        budget: Duration,
    ) -> McpResult<Value> {
        let payload = serde_json::to_string(&method.request(&self.client_info))?;
        let mut mode = ResponseMode::Json;

        loop {
            match mode {
                ResponseMode::Json => match self.post(current, &payload, budget).await? {
                    PostReply::Done(value) => return Ok(value),
                    PostReply::Negotiate(next) => {
                        info!(url = %current, mode = ?next, "Server rejected JSON POST, falling back");
                        mode = next;
                    }
                },
                ResponseMode::Sse => return self.open_event_stream(current, method, budget).await,
                ResponseMode::GetFallback => return self.get_with_query(current, &payload, budget).await,
            }
        }
    }

    async fn post(&self, current: &mut Url, payload: &str, budget: Duration) -> McpResult<PostReply> {
        let mut redirects = 0;

        while redirects <= self.max_redirects {
            debug!(url = %current, attempt = redirects + 1, "Sending MCP request");

            let response = match self
                .client
                .post(current.clone())
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .body(payload.to_string())
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if redirects == 0 => return Err(McpError::from_reqwest(e, budget)),
                Err(e) => {
                    warn!(url = %current, error = %e, "Request failed mid-redirect, retrying");
                    redirects += 1;
                    continue;
                }
            };

            let status = response.status();
            match StatusClass::of(status) {
                StatusClass::Redirect => {
                    let next = redirect_target(current, &response)?;
                    info!(from = %current, to = %next, status = status.as_u16(), "Following redirect");
                    *current = next;
                    redirects += 1;
                }
                StatusClass::NotAcceptable => {
                    let body = response.text().await.unwrap_or_default();
                    return Ok(PostReply::Negotiate(ResponseMode::negotiate(&body)));
                }
                StatusClass::Failure => return Err(status_error(response).await),
                StatusClass::Success => return read_rpc_body(response, budget).await.map(PostReply::Done),
            }
        }

        Err(McpError::TooManyRedirects(self.max_redirects))
    }

    /// Open the event stream and drop it once headers arrive.
    async fn open_event_stream(
        &self,
        url: &Url,
        method: RpcMethod,
        budget: Duration,
    ) -> McpResult<Value> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| McpError::from_reqwest(e, budget))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::HttpStatus {
                status: status.as_u16(),
                status_text: status_text(status),
                body: "SSE connection failed".to_string(),
            });
        }

        drop(response);
        debug!(url = %url, method = method.as_str(), "SSE stream opened, synthesizing result");
        Ok(synthesized_result(method))
    }

    async fn get_with_query(&self, url: &Url, payload: &str, budget: Duration) -> McpResult<Value> {
        let response = self
            .client
            .get(url.clone())
            .query(&[("request", payload)])
            .header(ACCEPT, "application/json, text/event-stream")
            .send()
            .await
            .map_err(|e| McpError::from_reqwest(e, budget))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        read_rpc_body(response, budget).await
    }
}

fn redirect_target(current: &Url, response: &Response) -> McpResult<Url> {
    let status = response.status().as_u16();
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or(McpError::MissingRedirectLocation(status))?
        .to_str()
        .map_err(|e| McpError::InvalidRedirect(e.to_string()))?;

    current
        .join(location)
        .map_err(|e| McpError::InvalidRedirect(format!("{location}: {e}")))
}

fn status_text(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

async fn status_error(response: Response) -> McpError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    McpError::HttpStatus {
        status: status.as_u16(),
        status_text: status_text(status),
        body,
    }
}

async fn read_rpc_body(response: Response, budget: Duration) -> McpResult<Value> {
    let is_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains(EVENT_STREAM));

    if is_stream {
        return read_event_stream(response).await?.into_result();
    }

    let body = response
        .text()
        .await
        .map_err(|e| McpError::from_reqwest(e, budget))?;
    JsonRpcResponse::parse(&body)?.into_result()
}

/// Read `data:` lines until one holds a JSON-RPC response.
async fn read_event_stream(response: Response) -> McpResult<JsonRpcResponse> {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| McpError::Network(format!("Stream error: {e}")))?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            if let Some(response) = parse_data_line(&line) {
                return Ok(response);
            }
        }
    }

    // Last line may lack a trailing newline.
    parse_data_line(&buffer).ok_or_else(|| {
        McpError::MalformedResponse("event stream ended without a response".to_string())
    })
}

fn parse_data_line(line: &str) -> Option<JsonRpcResponse> {
    let data = line.trim_end().strip_prefix("data:")?.trim_start();
    serde_json::from_str(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{
        body_partial_json, header, headers, method, path, query_param_contains,
    };
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BUDGET: Duration = Duration::from_secs(5);

    fn engine() -> HttpEngine {
        HttpEngine::new(Implementation::default(), DEFAULT_MAX_REDIRECTS).unwrap()
    }

    fn url(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    fn rpc_ok(id: u64, result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result
        }))
    }

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(StatusCode::MOVED_PERMANENTLY), StatusClass::Redirect);
        assert_eq!(StatusClass::of(StatusCode::FOUND), StatusClass::Redirect);
        assert_eq!(StatusClass::of(StatusCode::TEMPORARY_REDIRECT), StatusClass::Redirect);
        assert_eq!(StatusClass::of(StatusCode::PERMANENT_REDIRECT), StatusClass::Redirect);
        assert_eq!(StatusClass::of(StatusCode::SEE_OTHER), StatusClass::Failure);
        assert_eq!(StatusClass::of(StatusCode::NOT_ACCEPTABLE), StatusClass::NotAcceptable);
        assert_eq!(StatusClass::of(StatusCode::OK), StatusClass::Success);
        assert_eq!(StatusClass::of(StatusCode::ACCEPTED), StatusClass::Success);
        assert_eq!(StatusClass::of(StatusCode::NOT_FOUND), StatusClass::Failure);
        assert_eq!(StatusClass::of(StatusCode::INTERNAL_SERVER_ERROR), StatusClass::Failure);
    }

    #[test]
    fn test_negotiate() {
        assert_eq!(
            ResponseMode::negotiate("Client must accept text/event-stream"),
            ResponseMode::Sse
        );
        assert_eq!(ResponseMode::negotiate("Not Acceptable"), ResponseMode::GetFallback);
        assert_eq!(ResponseMode::negotiate(""), ResponseMode::GetFallback);
    }

    #[test]
    fn test_synthesized_result() {
        let init = synthesized_result(RpcMethod::Initialize);
        assert_eq!(init["serverInfo"]["name"], SSE_SERVER_NAME);
        assert_eq!(init["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(init["capabilities"]["tools"]["listChanged"], true);

        let tools = synthesized_result(RpcMethod::ToolsList);
        assert_eq!(tools, json!({ "tools": [] }));
    }

    #[test]
    fn test_parse_data_line() {
        let parsed = parse_data_line("data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n");
        assert!(parsed.is_some());
        assert!(parse_data_line("event: message\n").is_none());
        assert!(parse_data_line("data: not json\n").is_none());
    }

    #[tokio::test]
    async fn test_plain_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(json!({ "method": "initialize", "id": 1 })))
            .respond_with(rpc_ok(1, json!({ "serverInfo": { "name": "demo" } })))
            .expect(1)
            .mount(&server)
            .await;

        let target = url(&server, "/mcp");
        let exchange = engine().perform(&target, RpcMethod::Initialize, BUDGET).await;

        assert_eq!(exchange.final_url, target);
        assert_eq!(exchange.result.unwrap()["serverInfo"]["name"], "demo");
    }

    #[tokio::test]
    async fn test_relative_redirect_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(308).insert_header("Location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/new"))
            .respond_with(rpc_ok(2, json!({ "tools": [] })))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/old"), RpcMethod::ToolsList, BUDGET)
            .await;

        assert!(exchange.is_success());
        assert_eq!(exchange.final_url, url(&server, "/new"));
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(302))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::Initialize, BUDGET)
            .await;

        assert!(matches!(
            exchange.result,
            Err(McpError::MissingRedirectLocation(302))
        ));
    }

    #[tokio::test]
    async fn test_redirect_chain_at_limit_succeeds() {
        let server = MockServer::start().await;
        for (from, to) in [("/a", "/b"), ("/b", "/c"), ("/c", "/d")] {
            Mock::given(method("POST"))
                .and(path(from))
                .respond_with(ResponseTemplate::new(307).insert_header("Location", to))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/d"))
            .respond_with(rpc_ok(1, json!({})))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/a"), RpcMethod::Initialize, BUDGET)
            .await;

        assert!(exchange.is_success());
        assert_eq!(exchange.final_url.path(), "/d");
    }

    #[tokio::test]
    async fn test_redirect_chain_over_limit_fails() {
        let server = MockServer::start().await;
        for (from, to) in [("/a", "/b"), ("/b", "/c"), ("/c", "/d"), ("/d", "/e")] {
            Mock::given(method("POST"))
                .and(path(from))
                .respond_with(ResponseTemplate::new(301).insert_header("Location", to))
                .mount(&server)
                .await;
        }
        Mock::given(method("POST"))
            .and(path("/e"))
            .respond_with(rpc_ok(1, json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/a"), RpcMethod::Initialize, BUDGET)
            .await;

        assert!(matches!(exchange.result, Err(McpError::TooManyRedirects(3))));
    }

    #[tokio::test]
    async fn test_http_failure_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::Initialize, BUDGET)
            .await;

        let err = exchange.result.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error - boom");
    }

    #[tokio::test]
    async fn test_protocol_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "Method not found" }
            })))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::Initialize, BUDGET)
            .await;

        assert_eq!(
            exchange.result.unwrap_err().to_string(),
            "MCP error: Method not found (-32601)"
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::Initialize, BUDGET)
            .await;

        assert!(matches!(exchange.result, Err(McpError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_event_stream_body_on_post() {
        let server = MockServer::start().await;
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[{\"name\":\"echo\"}]}}\n\n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::ToolsList, BUDGET)
            .await;

        assert_eq!(exchange.result.unwrap()["tools"][0]["name"], "echo");
    }

    #[tokio::test]
    async fn test_not_acceptable_switches_to_sse() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(406)
                    .set_body_string("Not Acceptable: Client must accept text/event-stream"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("accept", "text/event-stream"))
            .and(header("cache-control", "no-cache"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/sse"), RpcMethod::Initialize, BUDGET)
            .await;

        let value = exchange.result.unwrap();
        assert_eq!(value["serverInfo"]["name"], SSE_SERVER_NAME);
    }

    #[tokio::test]
    async fn test_sse_open_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(406).set_body_string("text/event-stream"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/sse"), RpcMethod::ToolsList, BUDGET)
            .await;

        match exchange.result {
            Err(McpError::HttpStatus { status, body, .. }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "SSE connection failed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_not_acceptable_switches_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(406).set_body_string("Not Acceptable"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param_contains("request", "\"method\":\"tools/list\""))
            // Multi-valued headers are matched value by value.
            .and(headers("accept", vec!["application/json", "text/event-stream"]))
            .respond_with(rpc_ok(2, json!({ "tools": [{ "name": "search" }] })))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::ToolsList, BUDGET)
            .await;

        assert_eq!(exchange.result.unwrap()["tools"][0]["name"], "search");
    }

    #[tokio::test]
    async fn test_budget_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_ok(1, json!({})).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let target = url(&server, "/slow");
        let exchange = engine()
            .perform(&target, RpcMethod::Initialize, Duration::from_millis(200))
            .await;

        assert!(matches!(exchange.result, Err(McpError::Timeout(200))));
        assert_eq!(exchange.final_url, target);
    }

    #[tokio::test]
    async fn test_dead_redirect_target_is_retried_until_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(
                ResponseTemplate::new(307).insert_header("Location", "http://127.0.0.1:1/mcp"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let started = std::time::Instant::now();
        let exchange = engine()
            .perform(&url(&server, "/mcp"), RpcMethod::Initialize, BUDGET)
            .await;

        assert!(matches!(exchange.result, Err(McpError::TooManyRedirects(3))));
        assert_eq!(exchange.final_url.as_str(), "http://127.0.0.1:1/mcp");
        assert!(started.elapsed() < BUDGET);
    }

    #[tokio::test]
    async fn test_connection_refused_fails_immediately() {
        let target = Url::parse("http://127.0.0.1:1/mcp").unwrap();
        let exchange = engine().perform(&target, RpcMethod::Initialize, BUDGET).await;

        let err = exchange.result.unwrap_err();
        assert!(matches!(err, McpError::Network(_)));
        assert!(err.is_transport());
    }
}
