//! `mcpcat check`.
//!
//! Loads a catalog file into an in-memory repository, probes every entry and
//! prints what changed.

use anyhow::Context;
use mcpcat_core::{Bus, CatalogService, Config, UpdateScheduler};
use mcpcat_mcp::McpProber;
use mcpcat_storage::{CatalogEntry, MemoryRepository};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Catalog files are either a bare array or wrapped in `servers`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Entries(Vec<CatalogEntry>),
    Wrapped { servers: Vec<CatalogEntry> },
}

impl CatalogFile {
    fn into_entries(self) -> Vec<CatalogEntry> {
        match self {
            CatalogFile::Entries(entries) => entries,
            CatalogFile::Wrapped { servers } => servers,
        }
    }
}

#[derive(Serialize)]
struct CatalogOut<'a> {
    servers: &'a [CatalogEntry],
}

/// Re-check every server in `catalog`.
pub async fn handle_check(
    config: &Config,
    catalog: &Path,
    json: bool,
    write: bool,
) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(catalog)
        .await
        .with_context(|| format!("Failed to read catalog {}", catalog.display()))?;
    let entries = serde_json::from_str::<CatalogFile>(&content)
        .with_context(|| format!("Invalid catalog {}", catalog.display()))?
        .into_entries();
    let order: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
    tracing::info!(count = entries.len(), catalog = %catalog.display(), "Checking catalog");

    let settings = config.probe_settings()?;
    let prober = Arc::new(McpProber::new(settings.prober_config())?);
    let repository = Arc::new(MemoryRepository::with_entries(entries));
    let bus = Bus::new();
    let scheduler = UpdateScheduler::new(repository.clone(), prober, bus.clone(), settings);
    let service = CatalogService::new(repository, scheduler, bus);

    for (id, result) in service.recheck_all().await? {
        if let Err(e) = result {
            tracing::warn!(entry_id = %id, error = %e, "Re-check failed");
        }
    }

    // Keep the file's ordering rather than the repository's.
    let mut updated = Vec::with_capacity(order.len());
    for id in &order {
        if let Some(entry) = service.get(id).await? {
            updated.push(entry);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        print_table(&updated);
    }

    if write {
        let out = serde_json::to_string_pretty(&CatalogOut { servers: &updated })?;
        tokio::fs::write(catalog, out)
            .await
            .with_context(|| format!("Failed to write catalog {}", catalog.display()))?;
        tracing::info!(catalog = %catalog.display(), "Catalog written");
    }

    Ok(())
}

fn print_table(entries: &[CatalogEntry]) {
    if entries.is_empty() {
        println!("Catalog is empty.");
        return;
    }

    let width = entries
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!(
        "{:<width$}  {:<8}  {:>5}  {:<20}  ENDPOINT",
        "NAME", "STATUS", "TOOLS", "UPDATED"
    );
    for entry in entries {
        let endpoint = match &entry.actual_endpoint {
            Some(actual) => format!("{} -> {}", entry.endpoint, actual),
            None => entry.endpoint.clone(),
        };
        println!(
            "{:<width$}  {:<8}  {:>5}  {:<20}  {}",
            entry.name,
            entry.status.as_str(),
            entry.tools.len(),
            entry.updated_at.format("%Y-%m-%d %H:%M:%S"),
            endpoint
        );
    }
}
