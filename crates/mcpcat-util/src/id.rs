//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in mcpcat follow the pattern: `prefix_ulid`
//! For example: `srv_01hqxyz...` for catalog entries.

use ulid::Ulid;

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    /// A registered MCP server entry.
    Server,
    /// A single probe run.
    Probe,
}

impl IdPrefix {
    /// Get the string prefix for this identifier type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Server => "srv",
            IdPrefix::Probe => "prb",
        }
    }
}

/// Identifier generation.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        Self::with_ulid(prefix, Ulid::new())
    }

    /// Generate an identifier with a specific ULID (for testing or imports).
    pub fn with_ulid(prefix: IdPrefix, ulid: Ulid) -> String {
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Generate a catalog entry ID.
    pub fn server() -> String {
        Self::ascending(IdPrefix::Server)
    }

    /// Generate a probe run ID, used to correlate log lines of one probe.
    pub fn probe() -> String {
        Self::ascending(IdPrefix::Probe)
    }
}
