//! Model Context Protocol (MCP) prober.
//!
//! Answers one question about a remote MCP server: is it up, and which tools
//! does it advertise? A probe performs `initialize` followed by `tools/list`
//! and never fails with an error; everything is folded into a
//! [`ProbeOutcome`].
//!
//! # Supported Transports
//!
//! - **HTTP(S)**: JSON-RPC over POST, with manual redirect following and
//!   SSE / GET fallbacks when the server answers 406
//! - **WebSocket**: one initialize/tools-list session per socket
//! - **stdio**: accepted but not verified (no process is spawned)
//!
//! # Example
//!
//! ```no_run
//! use mcpcat_mcp::{McpProber, ProbeConfig, ProbeTarget, Prober};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let prober = McpProber::new(ProbeConfig::default())?;
//! let outcome = prober
//!     .probe(&ProbeTarget::streamable("https://mcp.example.com/mcp"))
//!     .await;
//!
//! if outcome.reachable {
//!     println!("tools: {:?}", outcome.tool_names());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod http;
pub mod probe;
pub mod protocol;
pub mod websocket;

pub use error::{duration_ms, McpError, McpResult};
pub use http::{Exchange, HttpEngine, ResponseMode, StatusClass};
pub use probe::{
    McpProber, ProbeConfig, ProbeOutcome, ProbeTarget, Prober, ServerInfo, TransportStrategy,
    TransportType, DEFAULT_PROBE_TIMEOUT,
};
pub use protocol::{Implementation, RpcMethod, ToolDescriptor};
pub use websocket::{WsProbe, WsSession, WsState};
