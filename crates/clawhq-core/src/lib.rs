//! `ClawHQ` Core Library
//!
//! Shared functionality for `ClawHQ` components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and timestamp formatting
//! - Tri-state field patching for partial updates
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod patch;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use patch::Patch;
