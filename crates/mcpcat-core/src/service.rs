//! Catalog service.
//!
//! Front door for catalog operations. Registration stores the entry and
//! queues a background probe; a failing probe never fails the registration.

use crate::bus::Bus;
use crate::error::{CoreError, CoreResult};
use crate::event::{EntryDeleted, EntryRegistered};
use crate::scheduler::{AppliedUpdate, UpdateScheduler};
use futures::future::join_all;
use mcpcat_storage::{CatalogEntry, EntryUpdate, NewEntry, Repository, SearchParams};
use std::sync::Arc;
use tracing::{info, warn};

pub struct CatalogService {
    repository: Arc<dyn Repository>,
    scheduler: UpdateScheduler,
    bus: Bus,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn Repository>, scheduler: UpdateScheduler, bus: Bus) -> Self {
        Self {
            repository,
            scheduler,
            bus,
        }
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Store a new entry and queue its first probe.
    pub async fn register(&self, entry: NewEntry) -> CoreResult<CatalogEntry> {
        let created = self.repository.create(entry).await?;
        info!(entry_id = %created.id, endpoint = %created.endpoint, "Registered server");

        self.bus
            .publish(EntryRegistered {
                entry_id: created.id.clone(),
                name: created.name.clone(),
            })
            .await;
        self.scheduler.schedule_background_update(created.id.clone());

        Ok(created)
    }

    pub async fn get(&self, id: &str) -> CoreResult<Option<CatalogEntry>> {
        Ok(self.repository.get_by_id(id).await?)
    }

    pub async fn list(&self) -> CoreResult<Vec<CatalogEntry>> {
        Ok(self.repository.list().await?)
    }

    /// Search entries. Empty parameters list everything.
    pub async fn search(&self, params: &SearchParams) -> CoreResult<Vec<CatalogEntry>> {
        if params.is_empty() {
            return self.list().await;
        }
        Ok(self.repository.search(params).await?)
    }

    pub async fn update(&self, id: &str, update: EntryUpdate) -> CoreResult<CatalogEntry> {
        if self.repository.get_by_id(id).await?.is_none() {
            return Err(CoreError::EntryNotFound(id.to_string()));
        }
        Ok(self.repository.update(id, update).await?)
    }

    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        if self.repository.get_by_id(id).await?.is_none() {
            return Err(CoreError::EntryNotFound(id.to_string()));
        }
        self.repository.delete(id).await?;
        self.bus
            .publish(EntryDeleted {
                entry_id: id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Probe an entry now and return what was written.
    pub async fn recheck(&self, id: &str) -> CoreResult<AppliedUpdate> {
        self.scheduler.run_immediate_update(id).await
    }

    /// Probe every entry concurrently.
    pub async fn recheck_all(&self) -> CoreResult<Vec<(String, CoreResult<AppliedUpdate>)>> {
        let ids: Vec<String> = self.list().await?.into_iter().map(|e| e.id).collect();
        let results = join_all(ids.iter().map(|id| self.recheck(id))).await;
        Ok(ids.into_iter().zip(results).collect())
    }

    /// Whether the repository answers. Errors count as "no".
    pub async fn ping(&self) -> bool {
        match self.repository.ping().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Repository ping failed");
                false
            }
        }
    }
}
