//! Catalog storage for mcpcat.
//!
//! The prober never touches storage directly. It reads an entry to learn
//! the endpoint and transport, and writes probe results back through
//! [`Repository::update`]. Backends:
//! - In-memory repository (tests, one-shot CLI checks)

pub mod error;
pub mod memory;
pub mod model;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryRepository;
pub use model::{
    CatalogEntry, EntryUpdate, NewEntry, SearchParams, ServerStatus, ServerType, StoredServerInfo,
};

use async_trait::async_trait;

/// Persistence of catalog entries.
///
/// Updates are last-write-wins; two concurrent updates to the same id
/// are not ordered by the repository.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Fetch an entry by id. Returns `None` if it doesn't exist.
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<CatalogEntry>>;

    /// List all entries, newest first.
    async fn list(&self) -> StorageResult<Vec<CatalogEntry>>;

    /// Create an entry with status `unknown`.
    async fn create(&self, entry: NewEntry) -> StorageResult<CatalogEntry>;

    /// Apply a partial update and return the stored result.
    async fn update(&self, id: &str, update: EntryUpdate) -> StorageResult<CatalogEntry>;

    /// Delete an entry.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Search and filter entries, newest first.
    async fn search(&self, params: &SearchParams) -> StorageResult<Vec<CatalogEntry>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> StorageResult<bool>;
}
