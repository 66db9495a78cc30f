//! MCP error types.
//!
//! Every variant renders to the human-readable reason that ends up in
//! `ProbeOutcome::error`, so display strings are part of the contract.

use std::time::Duration;
use thiserror::Error;

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors that can occur while probing an MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Connect, DNS, TLS or body read failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The per-call budget ran out.
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Non-2xx status other than a redirect or 406.
    #[error("HTTP {status}: {status_text} - {body}")]
    HttpStatus {
        status: u16,
        status_text: String,
        body: String,
    },

    /// Redirect status without a `Location` header.
    #[error("Redirect response ({0}) without Location header")]
    MissingRedirectLocation(u16),

    /// `Location` header that cannot be resolved to a URL.
    #[error("Invalid redirect location: {0}")]
    InvalidRedirect(String),

    /// Redirect chain longer than allowed.
    #[error("Too many redirects (>{0})")]
    TooManyRedirects(usize),

    /// The peer answered with a JSON-RPC error object.
    #[error("MCP error: {message} ({code})")]
    Protocol { code: i64, message: String },

    /// Body is not JSON or doesn't match the expected shape.
    #[error("Invalid MCP response: {0}")]
    MalformedResponse(String),

    /// Socket closed before `initialize` completed.
    #[error("WebSocket connection closed early (code: {0})")]
    WebSocketClosedEarly(u16),

    /// No `tools/list` reply within the session budget.
    #[error("WebSocket session timed out after {0}ms")]
    WebSocketTimeout(u64),

    /// Any other WebSocket failure.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Endpoint is not a valid absolute URL.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// URL scheme is neither HTTP(S) nor WS(S).
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Classify a reqwest failure.
    pub fn from_reqwest(error: reqwest::Error, budget: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(duration_ms(budget))
        } else {
            Self::Network(error.to_string())
        }
    }

    /// Create an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the failure happened before any bytes reached the peer
    /// (as opposed to the peer answering badly).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::WebSocket(_)
                | Self::WebSocketClosedEarly(_)
                | Self::WebSocketTimeout(_)
        )
    }
}

/// Milliseconds in a duration, saturating.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
