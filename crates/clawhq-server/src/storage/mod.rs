//! `SQLite` storage for the `ClawHQ` hub.
//!
//! Provides persistence for agent identities, tasks, task notes, and the
//! registration throttle buckets.

mod db;
mod models;
mod queries;
mod queries_tasks;
mod queries_throttle;


pub use db::{DatabaseError, HubDatabase};
pub use models::*;
