//! Core logic for mcpcat.
//!
//! This crate ties the prober to the catalog:
//! - Layered configuration
//! - Update scheduler (probe an entry, persist the outcome)
//! - Catalog service (register, search, re-check)
//! - Event bus for probe notifications

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod scheduler;
pub mod service;

pub use bus::{Bus, BusEvent, Event};
pub use config::{Config, ProbeSettings};
pub use error::{ConfigError, CoreError, CoreResult};
pub use event::{EntryDeleted, EntryRegistered, ProbeCompleted, ProbeFailed};
pub use scheduler::{update_from_outcome, AppliedUpdate, UpdateScheduler};
pub use service::CatalogService;
