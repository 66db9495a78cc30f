//! Shared utilities for mcpcat.
//!
//! This crate provides common utilities used across the mcpcat workspace:
//! - Logging setup with tracing
//! - ULID-based identifier generation
//! - RAII-based timing for operation measurement

pub mod id;
pub mod log;
pub mod timing;

pub use id::Identifier;
pub use timing::TimingGuard;
