//! Catalog entry model.
//!
//! Field names on the wire follow the catalog's JSON export format:
//! timestamps are snake_case, probe-derived fields are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the registered MCP server is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// HTTP(S) or WebSocket endpoint.
    Streamable,
    /// Local process speaking over stdin/stdout.
    Stdio,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Streamable => "streamable",
            ServerType::Stdio => "stdio",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "streamable" => Ok(ServerType::Streamable),
            "stdio" => Ok(ServerType::Stdio),
            other => Err(format!(
                "type must be 'streamable' or 'stdio', got '{other}'"
            )),
        }
    }
}

/// Last known liveness of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    /// Never probed.
    #[default]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Online => "online",
            ServerStatus::Offline => "offline",
            ServerStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity reported by the server during `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

/// A registered MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ServerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tool names, in the order the server listed them.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(rename = "serverInfo", default, skip_serializing_if = "Option::is_none")]
    pub server_info: Option<StoredServerInfo>,
    /// Set when the endpoint redirected to a different working URL.
    #[serde(rename = "actualEndpoint", default, skip_serializing_if = "Option::is_none")]
    pub actual_endpoint: Option<String>,
}

impl CatalogEntry {
    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn apply(&mut self, update: &EntryUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(endpoint) = &update.endpoint {
            self.endpoint = endpoint.clone();
        }
        if let Some(server_type) = update.server_type {
            self.server_type = server_type;
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(tools) = &update.tools {
            self.tools = tools.clone();
        }
        if let Some(server_info) = &update.server_info {
            self.server_info = Some(server_info.clone());
        }
        if let Some(actual_endpoint) = &update.actual_endpoint {
            self.actual_endpoint = Some(actual_endpoint.clone());
        }
        if let Some(updated_at) = update.updated_at {
            self.updated_at = updated_at;
        }
    }
}

/// Fields required to register a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub name: String,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewEntry {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        server_type: ServerType,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            server_type,
            description: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.endpoint.trim().is_empty() {
            return Err("endpoint is required".to_string());
        }
        Ok(())
    }
}

/// Partial update of an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub server_type: Option<ServerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_info: Option<StoredServerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_endpoint: Option<String>,
    #[serde(rename = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Search and filter parameters. Unset fields don't filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    /// Case-insensitive match on name or description, or an exact tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub server_type: Option<ServerType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ServerStatus>,
    /// Matches entries sharing at least one tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl SearchParams {
    /// Whether any filter is set.
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.server_type.is_none()
            && self.status.is_none()
            && self.tags.as_ref().map_or(true, Vec::is_empty)
    }

    /// Check a single entry against all filters.
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = search.to_lowercase();
            let hit = entry.name.to_lowercase().contains(&needle)
                || entry.description.to_lowercase().contains(&needle)
                || entry.tags.iter().any(|t| t == search);
            if !hit {
                return false;
            }
        }
        if let Some(server_type) = self.server_type {
            if entry.server_type != server_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(tags) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            if !entry.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        true
    }
}
