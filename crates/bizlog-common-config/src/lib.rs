//! Configuration for bizlog.
//!
//! Reads `bizlog.yaml` (dispatcher sizing and log output), expands
//! `${VAR}` / `${VAR:-default}` placeholders and applies `BIZLOG_*`
//! environment overrides.

pub mod env;
pub mod loader;
pub mod types;


pub use env::*;
pub use loader::*;
pub use types::*;
