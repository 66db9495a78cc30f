//! Command handlers for the mcpcat CLI.

pub mod check;
pub mod config;
pub mod logging;
pub mod probe;

pub use check::*;
pub use config::*;
pub use logging::*;
pub use probe::*;
