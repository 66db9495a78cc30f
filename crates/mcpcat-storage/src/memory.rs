//! In-memory repository.
//!
//! Stores all entries in a process-local map. Nothing is persisted.

use crate::model::{CatalogEntry, EntryUpdate, NewEntry, SearchParams, ServerStatus};
use crate::{Repository, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use mcpcat_util::Identifier;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory catalog repository.
pub struct MemoryRepository {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a repository pre-populated with existing entries (e.g. a catalog export).
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let map = entries
            .into_iter()
            .map(|entry| (entry.id.clone(), entry))
            .collect();
        Self {
            entries: RwLock::new(map),
        }
    }

    fn sorted_newest_first(mut entries: Vec<CatalogEntry>) -> Vec<CatalogEntry> {
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        entries
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(entries.get(id).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(Self::sorted_newest_first(entries.values().cloned().collect()))
    }

    async fn create(&self, entry: NewEntry) -> StorageResult<CatalogEntry> {
        entry.validate().map_err(StorageError::Invalid)?;

        let now = Utc::now();
        let created = CatalogEntry {
            id: Identifier::server(),
            name: entry.name,
            endpoint: entry.endpoint,
            server_type: entry.server_type,
            description: entry.description,
            tags: entry.tags,
            status: ServerStatus::Unknown,
            created_at: now,
            updated_at: now,
            tools: Vec::new(),
            server_info: None,
            actual_endpoint: None,
        };

        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        entries.insert(created.id.clone(), created.clone());
        debug!(id = %created.id, name = %created.name, "Created catalog entry");

        Ok(created)
    }

    async fn update(&self, id: &str, update: EntryUpdate) -> StorageResult<CatalogEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(id))?;
        entry.apply(&update);
        Ok(entry.clone())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        entries
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(id))
    }

    async fn search(&self, params: &SearchParams) -> StorageResult<Vec<CatalogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        let hits = entries
            .values()
            .filter(|entry| params.matches(entry))
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(hits))
    }

    async fn ping(&self) -> StorageResult<bool> {
        self.entries
            .read()
            .map(|_| true)
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))
    }
}
