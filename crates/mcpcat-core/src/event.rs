//! Events published on the [`Bus`](crate::bus::Bus).

use crate::bus::Event;
use serde::{Deserialize, Serialize};

/// A probe finished and its result was handed to the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeCompleted {
    pub entry_id: String,
    pub endpoint: String,
    pub reachable: bool,
    pub tool_count: usize,
    pub response_time_ms: u64,
}

impl Event for ProbeCompleted {
    fn event_type() -> &'static str {
        "probe.completed"
    }
}

/// A probe found the server unreachable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeFailed {
    pub entry_id: String,
    pub endpoint: String,
    /// Failure reason exactly as the prober reported it.
    pub reason: String,
}

impl Event for ProbeFailed {
    fn event_type() -> &'static str {
        "probe.failed"
    }
}

/// A catalog entry was registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryRegistered {
    pub entry_id: String,
    pub name: String,
}

impl Event for EntryRegistered {
    fn event_type() -> &'static str {
        "entry.registered"
    }
}

/// A catalog entry was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDeleted {
    pub entry_id: String,
}

impl Event for EntryDeleted {
    fn event_type() -> &'static str {
        "entry.deleted"
    }
}
