//! `ClawHQ` Hub Library
//!
//! Core functionality for the `ClawHQ` agent hub:
//! - Bearer token codec, argon2 secret storage, and passphrase checks
//! - Fixed-window registration throttle over pluggable bucket stores
//! - `SQLite` storage for agents, tasks, task notes, and throttle buckets
//! - Status and task payload validation
//! - axum HTTP API and agent integration documents

pub mod auth;
pub mod http;
pub mod skill;
pub mod storage;
pub mod telemetry;
pub mod throttle;
