//! Background update scheduler.
//!
//! Probes a stored entry and writes the outcome back through the repository.
//! Background updates run on a [`TaskTracker`] so the caller returns before
//! the probe starts; [`UpdateScheduler::wait_idle`] drains them.
//!
//! Probes of the same entry are not serialized. If two overlap, whichever
//! finishes last wins.

use crate::bus::Bus;
use crate::config::ProbeSettings;
use crate::error::{CoreError, CoreResult};
use crate::event::{ProbeCompleted, ProbeFailed};
use chrono::{DateTime, Utc};
use mcpcat_mcp::{duration_ms, ProbeOutcome, ProbeTarget, Prober, ServerInfo, TransportType};
use mcpcat_storage::{
    CatalogEntry, EntryUpdate, Repository, ServerStatus, ServerType, StoredServerInfo,
};
use mcpcat_util::TimingGuard;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Result of an immediate update.
#[derive(Debug, Clone)]
pub struct AppliedUpdate {
    /// What was sent to the repository.
    pub update: EntryUpdate,
    /// The entry as stored afterwards.
    pub entry: CatalogEntry,
    pub outcome: ProbeOutcome,
}

/// Runs probes for catalog entries and persists their results.
#[derive(Clone)]
pub struct UpdateScheduler {
    repository: Arc<dyn Repository>,
    prober: Arc<dyn Prober>,
    bus: Bus,
    settings: ProbeSettings,
    tracker: TaskTracker,
}

impl UpdateScheduler {
    pub fn new(
        repository: Arc<dyn Repository>,
        prober: Arc<dyn Prober>,
        bus: Bus,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            repository,
            prober,
            bus,
            settings,
            tracker: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Queue a probe for `id` and return immediately.
    ///
    /// Failures are logged; nobody is waiting for the result.
    pub fn schedule_background_update(&self, id: impl Into<String>) {
        let id = id.into();
        let this = self.clone();
        let delay = self.settings.background_delay;

        debug!(entry_id = %id, delay_ms = duration_ms(delay), "Scheduling background update");
        self.tracker.spawn(async move {
            tokio::time::sleep(delay).await;
            match this.run_immediate_update(&id).await {
                Ok(applied) => debug!(
                    entry_id = %id,
                    status = %applied.entry.status,
                    "Background update applied"
                ),
                Err(e) => warn!(entry_id = %id, error = %e, "Background update failed"),
            }
        });
    }

    /// Number of background updates still running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every background update has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Probe `id` now and persist the result.
    pub async fn run_immediate_update(&self, id: &str) -> CoreResult<AppliedUpdate> {
        let _timer = TimingGuard::update(id);

        let entry = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::EntryNotFound(id.to_string()))?;

        let target = ProbeTarget::new(&entry.endpoint, transport_for(entry.server_type))
            .with_timeout(self.settings.timeout);
        let outcome = self.prober.probe(&target).await;
        self.announce(&entry, &outcome).await;

        let update = update_from_outcome(&outcome, Utc::now());
        let stored = self.repository.update(id, update.clone()).await?;

        info!(
            entry_id = %id,
            status = %stored.status,
            tools = stored.tools.len(),
            "Entry status updated"
        );

        Ok(AppliedUpdate {
            update,
            entry: stored,
            outcome,
        })
    }

    async fn announce(&self, entry: &CatalogEntry, outcome: &ProbeOutcome) {
        self.bus
            .publish(ProbeCompleted {
                entry_id: entry.id.clone(),
                endpoint: entry.endpoint.clone(),
                reachable: outcome.reachable,
                tool_count: outcome.tools.len(),
                response_time_ms: outcome.response_time_ms,
            })
            .await;

        if !outcome.reachable {
            self.bus
                .publish(ProbeFailed {
                    entry_id: entry.id.clone(),
                    endpoint: entry.endpoint.clone(),
                    reason: outcome.error.clone().unwrap_or_default(),
                })
                .await;
        }
    }
}

/// Map a probe outcome to the partial update written to the repository.
///
/// An unreachable outcome only flips the status; tools, server info and the
/// redirected endpoint from the last good probe are kept.
pub fn update_from_outcome(outcome: &ProbeOutcome, now: DateTime<Utc>) -> EntryUpdate {
    let mut update = EntryUpdate {
        status: Some(if outcome.reachable {
            ServerStatus::Online
        } else {
            ServerStatus::Offline
        }),
        updated_at: Some(now),
        ..Default::default()
    };

    if outcome.reachable {
        update.tools = Some(outcome.tool_names());
        update.server_info = outcome.server_info.clone().map(stored_info);
        update.actual_endpoint = outcome.actual_endpoint.clone();
    }

    update
}

fn transport_for(server_type: ServerType) -> TransportType {
    match server_type {
        ServerType::Streamable => TransportType::Streamable,
        ServerType::Stdio => TransportType::Stdio,
    }
}

fn stored_info(info: ServerInfo) -> StoredServerInfo {
    StoredServerInfo {
        name: info.name,
        version: info.version,
        protocol_version: info.protocol_version,
    }
}
