//! WebSocket session driver.
//!
//! One socket, one `initialize` followed by one `tools/list`. The protocol
//! logic lives in [`WsSession`], a synchronous state machine fed with socket
//! events; [`probe`] only moves frames and enforces the deadline.

use crate::error::{duration_ms, McpError};
use crate::protocol::{Implementation, JsonRpcRequest, JsonRpcResponse, RpcMethod};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

/// Close code reported when a close frame carries no status.
const NO_STATUS_RECEIVED: u16 = 1005;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

/// Upper bound on the closing handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WsState {
    Connecting,
    Initializing,
    ListingTools,
    Done,
    Failed,
}

impl WsState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WsState::Done | WsState::Failed)
    }
}

/// What the driver should do next.
#[derive(Debug)]
pub enum Step {
    Send(JsonRpcRequest),
    Wait,
    Done,
    Fail(McpError),
}

/// Protocol state for one WebSocket probe.
#[derive(Debug)]
pub struct WsSession {
    state: WsState,
    client_info: Implementation,
    initialize: Option<Value>,
    tools: Option<Value>,
}

impl WsSession {
    pub fn new(client_info: Implementation) -> Self {
        Self {
            state: WsState::Connecting,
            client_info,
            initialize: None,
            tools: None,
        }
    }

    pub fn state(&self) -> WsState {
        self.state
    }

    /// Socket is open: send `initialize`.
    pub fn on_open(&mut self) -> Step {
        if self.state != WsState::Connecting {
            return Step::Wait;
        }
        self.state = WsState::Initializing;
        Step::Send(RpcMethod::Initialize.request(&self.client_info))
    }

    /// A text frame arrived.
    pub fn on_text(&mut self, text: &str) -> Step {
        if self.state.is_terminal() {
            return Step::Wait;
        }

        let response = match JsonRpcResponse::parse(text) {
            Ok(response) => response,
            Err(e) => return self.fail(e),
        };

        // A peer error fails the session whatever id it carries (often `null`).
        if let Some(error) = response.error {
            return self.fail(McpError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        match self.state {
            WsState::Initializing if response.answers(RpcMethod::Initialize.id()) => {
                match response.into_result() {
                    Ok(result) => {
                        self.initialize = Some(result);
                        self.state = WsState::ListingTools;
                        Step::Send(RpcMethod::ToolsList.request(&self.client_info))
                    }
                    Err(e) => self.fail(e),
                }
            }
            WsState::ListingTools if response.answers(RpcMethod::ToolsList.id()) => {
                match response.into_result() {
                    Ok(result) => {
                        self.tools = Some(result);
                        self.state = WsState::Done;
                        Step::Done
                    }
                    Err(e) => self.fail(e),
                }
            }
            // Notifications and stray replies.
            _ => {
                debug!(id = %response.id, state = ?self.state, "Ignoring unrelated message");
                Step::Wait
            }
        }
    }

    /// The peer closed the socket (or the stream ended).
    pub fn on_close(&mut self, code: u16) -> Step {
        match self.state {
            WsState::Connecting | WsState::Initializing => {
                self.fail(McpError::WebSocketClosedEarly(code))
            }
            WsState::ListingTools => self.fail(McpError::WebSocket(format!(
                "connection closed before tools/list reply (code: {code})"
            ))),
            WsState::Done | WsState::Failed => Step::Wait,
        }
    }

    /// The session deadline passed.
    pub fn on_timeout(&mut self, budget_ms: u64) -> Step {
        if self.state.is_terminal() {
            return Step::Wait;
        }
        self.fail(McpError::WebSocketTimeout(budget_ms))
    }

    /// Transport failure (connect, read or write).
    pub fn on_error(&mut self, error: impl ToString) -> Step {
        if self.state.is_terminal() {
            return Step::Wait;
        }
        self.fail(McpError::WebSocket(error.to_string()))
    }

    fn fail(&mut self, error: McpError) -> Step {
        self.state = WsState::Failed;
        Step::Fail(error)
    }

    fn finish(self, error: Option<McpError>) -> WsProbe {
        WsProbe {
            initialize: self.initialize,
            tools: self.tools,
            error,
        }
    }
}

/// Result of a WebSocket probe.
#[derive(Debug)]
pub struct WsProbe {
    /// Raw `initialize` result, if that step completed.
    pub initialize: Option<Value>,
    /// Raw `tools/list` result, if that step completed.
    pub tools: Option<Value>,
    pub error: Option<McpError>,
}

impl WsProbe {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.tools.is_some()
    }
}

/// Run an initialize/tools-list session against `url` within `budget`.
pub async fn probe(url: &Url, budget: Duration, client_info: &Implementation) -> WsProbe {
    let deadline = Instant::now() + budget;
    let budget_ms = duration_ms(budget);
    let mut session = WsSession::new(client_info.clone());

    debug!(url = %url, "Opening WebSocket");
    let mut socket = match tokio::time::timeout_at(deadline, connect_async(url.as_str())).await {
        Ok(Ok((socket, _))) => socket,
        Ok(Err(e)) => {
            let error = match session.on_error(format!("connection failed: {e}")) {
                Step::Fail(error) => Some(error),
                _ => None,
            };
            return session.finish(error);
        }
        Err(_) => {
            let error = match session.on_timeout(budget_ms) {
                Step::Fail(error) => Some(error),
                _ => None,
            };
            return session.finish(error);
        }
    };

    let mut step = session.on_open();
    let error = loop {
        step = match step {
            Step::Done => break None,
            Step::Fail(error) => break Some(error),
            Step::Send(request) => send(&mut socket, &mut session, &request).await,
            Step::Wait => match tokio::time::timeout_at(deadline, socket.next()).await {
                Err(_) => session.on_timeout(budget_ms),
                Ok(None) => session.on_close(ABNORMAL_CLOSURE),
                Ok(Some(Err(e))) => session.on_error(e),
                Ok(Some(Ok(Message::Text(text)))) => session.on_text(text.as_str()),
                Ok(Some(Ok(Message::Close(frame)))) => session.on_close(
                    frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_STATUS_RECEIVED),
                ),
                Ok(Some(Ok(_))) => Step::Wait,
            },
        };
    };

    close(&mut socket).await;
    if let Some(ref e) = error {
        debug!(url = %url, state = ?session.state(), error = %e, "WebSocket probe failed");
    }
    session.finish(error)
}

async fn send(socket: &mut Socket, session: &mut WsSession, request: &JsonRpcRequest) -> Step {
    let text = match serde_json::to_string(request) {
        Ok(text) => text,
        Err(e) => return session.on_error(e),
    };
    debug!(method = %request.method, "Sending WebSocket request");
    match socket.send(Message::text(text)).await {
        Ok(()) => Step::Wait,
        Err(e) => session.on_error(e),
    }
}

async fn close(socket: &mut Socket) {
    match tokio::time::timeout(CLOSE_GRACE, socket.close(None)).await {
        Ok(Ok(())) => {}
        // Already closed by the peer.
        Ok(Err(_)) => {}
        Err(_) => warn!("WebSocket close handshake timed out"),
    }
}
