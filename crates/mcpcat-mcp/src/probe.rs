//! Protocol orchestrator.
//!
//! Turns a [`ProbeTarget`] into a [`ProbeOutcome`]. Every failure below this
//! point ends up as a string on the outcome, so callers never have to handle
//! an error to learn that a server is down.

use crate::error::{McpError, McpResult};
use crate::http::{HttpEngine, DEFAULT_MAX_REDIRECTS};
use crate::protocol::{Implementation, InitializeResult, ListToolsResult, RpcMethod, ToolDescriptor};
use crate::websocket::{self, WsProbe};
use async_trait::async_trait;
use mcpcat_util::{Identifier, TimingGuard};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

/// Budget for one probe when the caller gives none.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Placeholder reported for stdio servers, which are never contacted.
pub const STDIO_SERVER_NAME: &str = "STDIO MCP Server";

const UNKNOWN: &str = "unknown";

/// How a server is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// HTTP(S) or WebSocket.
    #[default]
    Streamable,
    /// Local process. Cannot be verified from here.
    Stdio,
}

impl TransportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Streamable => "streamable",
            TransportType::Stdio => "stdio",
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "streamable" => Ok(TransportType::Streamable),
            "stdio" => Ok(TransportType::Stdio),
            other => Err(format!("unknown transport type: {other}")),
        }
    }
}

/// What to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub endpoint: String,
    pub transport: TransportType,
    pub timeout: Duration,
}

impl ProbeTarget {
    pub fn new(endpoint: impl Into<String>, transport: TransportType) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn streamable(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, TransportType::Streamable)
    }

    pub fn stdio(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint, TransportType::Stdio)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Transport chosen from the endpoint's scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStrategy {
    Http(Url),
    WebSocket(Url),
}

impl TransportStrategy {
    pub fn for_endpoint(endpoint: &str) -> McpResult<Self> {
        let url = Url::parse(endpoint.trim())
            .map_err(|e| McpError::invalid_endpoint(endpoint, e))?;

        match url.scheme() {
            "http" | "https" => Ok(Self::Http(url)),
            "ws" | "wss" => Ok(Self::WebSocket(url)),
            other => Err(McpError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Identity a server reported during `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

impl ServerInfo {
    fn stdio() -> Self {
        Self {
            name: STDIO_SERVER_NAME.to_string(),
            version: UNKNOWN.to_string(),
            protocol_version: UNKNOWN.to_string(),
        }
    }
}

impl From<InitializeResult> for ServerInfo {
    fn from(result: InitializeResult) -> Self {
        Self {
            name: result.server_info.name,
            version: result
                .server_info
                .version
                .unwrap_or_else(|| UNKNOWN.to_string()),
            protocol_version: result.protocol_version,
        }
    }
}

/// Result of one probe. Always well formed, even when the server is down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// `initialize` completed.
    pub reachable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<ServerInfo>,
    #[serde(default)]
    pub tools: Vec<ToolDescriptor>,
    /// Set when redirects moved the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_endpoint: Option<String>,
    pub response_time_ms: u64,
    /// First failure encountered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn unreachable(error: impl ToString) -> Self {
        Self {
            reachable: false,
            server_info: None,
            tools: Vec::new(),
            actual_endpoint: None,
            response_time_ms: 0,
            error: Some(error.to_string()),
        }
    }

    fn stdio() -> Self {
        Self {
            reachable: true,
            server_info: Some(ServerInfo::stdio()),
            tools: Vec::new(),
            actual_endpoint: None,
            response_time_ms: 0,
            error: None,
        }
    }

    fn reachable(server_info: ServerInfo) -> Self {
        Self {
            reachable: true,
            server_info: Some(server_info),
            tools: Vec::new(),
            actual_endpoint: None,
            response_time_ms: 0,
            error: None,
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }
}

/// Something that can probe an MCP server.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome;
}

/// Settings for [`McpProber`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub client_info: Implementation,
    pub max_redirects: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            client_info: Implementation::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

/// Probes servers over HTTP(S) and WebSocket.
#[derive(Debug, Clone)]
pub struct McpProber {
    engine: HttpEngine,
}

impl McpProber {
    pub fn new(config: ProbeConfig) -> McpResult<Self> {
        Ok(Self {
            engine: HttpEngine::new(config.client_info, config.max_redirects)?,
        })
    }

    async fn probe_http(&self, url: &Url, timeout: Duration) -> ProbeOutcome {
        let init = self.engine.perform(url, RpcMethod::Initialize, timeout).await;

        let server_info = match init.result.and_then(InitializeResult::from_value) {
            Ok(result) => ServerInfo::from(result),
            Err(e) => {
                log_failure(url, RpcMethod::Initialize, &e);
                return ProbeOutcome::unreachable(e);
            }
        };
        // Only a successful exchange tells us where the server lives.
        let actual_endpoint = (init.final_url != *url).then(|| init.final_url.to_string());

        let mut outcome = ProbeOutcome {
            actual_endpoint,
            ..ProbeOutcome::reachable(server_info)
        };

        // Reuse the URL initialize ended on so redirects are not renegotiated.
        let list = self
            .engine
            .perform(&init.final_url, RpcMethod::ToolsList, timeout)
            .await;
        match list.result.and_then(ListToolsResult::from_value) {
            Ok(result) => outcome.tools = result.tools,
            Err(e) => {
                log_failure(&list.final_url, RpcMethod::ToolsList, &e);
                outcome.error = Some(e.to_string());
            }
        }

        outcome
    }

    async fn probe_websocket(&self, url: &Url, timeout: Duration) -> ProbeOutcome {
        let WsProbe {
            initialize,
            tools,
            error,
        } = websocket::probe(url, timeout, self.engine.client_info()).await;

        let server_info = match initialize.map(InitializeResult::from_value) {
            Some(Ok(result)) => ServerInfo::from(result),
            Some(Err(e)) => return ProbeOutcome::unreachable(e),
            None => {
                let e = error.unwrap_or_else(|| McpError::WebSocket("session ended".to_string()));
                log_failure(url, RpcMethod::Initialize, &e);
                return ProbeOutcome::unreachable(e);
            }
        };

        let mut outcome = ProbeOutcome::reachable(server_info);
        match (tools.map(ListToolsResult::from_value), error) {
            (Some(Ok(result)), None) => outcome.tools = result.tools,
            (Some(Err(e)), _) | (None, Some(e)) => {
                log_failure(url, RpcMethod::ToolsList, &e);
                outcome.error = Some(e.to_string());
            }
            (Some(Ok(_)), Some(e)) => outcome.error = Some(e.to_string()),
            (None, None) => outcome.error = Some("WebSocket session ended without tools".to_string()),
        }
        outcome
    }
}

#[async_trait]
impl Prober for McpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeOutcome {
        // One id per run ties together the engine's per-request events.
        let span = info_span!(
            "probe",
            probe_id = %Identifier::probe(),
            transport = %target.transport
        );
        self.run(target).instrument(span).await
    }
}

impl McpProber {
    async fn run(&self, target: &ProbeTarget) -> ProbeOutcome {
        let timer = TimingGuard::probe(&target.endpoint);

        let mut outcome = match target.transport {
            TransportType::Stdio => {
                debug!(endpoint = %target.endpoint, "stdio server, skipping network probe");
                ProbeOutcome::stdio()
            }
            TransportType::Streamable => match TransportStrategy::for_endpoint(&target.endpoint) {
                Ok(TransportStrategy::Http(url)) => self.probe_http(&url, target.timeout).await,
                Ok(TransportStrategy::WebSocket(url)) => {
                    self.probe_websocket(&url, target.timeout).await
                }
                Err(e) => {
                    warn!(endpoint = %target.endpoint, error = %e, "Cannot probe endpoint");
                    ProbeOutcome::unreachable(e)
                }
            },
        };

        outcome.response_time_ms = timer.elapsed_ms();
        info!(
            endpoint = %target.endpoint,
            reachable = outcome.reachable,
            tools = outcome.tools.len(),
            elapsed_ms = outcome.response_time_ms,
            "Probe finished"
        );
        outcome
    }
}

fn log_failure(url: &Url, method: RpcMethod, error: &McpError) {
    if error.is_transport() {
        debug!(endpoint = %url, method = method.as_str(), error = %error, "MCP call failed");
    } else {
        warn!(endpoint = %url, method = method.as_str(), error = %error, "MCP call failed");
    }
}
