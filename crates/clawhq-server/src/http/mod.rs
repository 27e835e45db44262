//! HTTP API for the `ClawHQ` hub.
//!
//! Public routes: registration, integration documents, health. Everything
//! under `/api/v1/agents/me` requires a bearer token.

pub mod agent_me;
pub mod auth;
pub mod docs;
pub mod error;
pub mod extract;
pub mod registration;
pub mod views;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod registration_tests;

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use clawhq_core::Config;
use tower_http::trace::TraceLayer;

use crate::auth::TokenStore;
use crate::storage::HubDatabase;
use crate::throttle::{BucketStore, RegistrationThrottle};

pub use auth::AuthenticatedAgent;
pub use error::ApiError;

/// Request-independent settings the handlers read.
#[derive(Clone)]
pub struct HubSettings {
    pub passphrase: String,
    pub public_url: Option<String>,
    pub heartbeat_seconds: u64,
    pub poll_seconds: u64,
    pub max_body_bytes: usize,
}

impl HubSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            passphrase: config.registration.passphrase.clone(),
            public_url: config.server.public_url.clone(),
            heartbeat_seconds: config.agents.heartbeat_seconds,
            poll_seconds: config.agents.poll_seconds,
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

impl fmt::Debug for HubSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubSettings")
            .field("passphrase", &"<redacted>")
            .field("public_url", &self.public_url)
            .field("heartbeat_seconds", &self.heartbeat_seconds)
            .field("poll_seconds", &self.poll_seconds)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: HubDatabase,
    pub tokens: TokenStore,
    pub throttle: RegistrationThrottle,
    pub settings: Arc<HubSettings>,
}

impl AppState {
    /// Wire state from configuration, keeping throttle buckets in `buckets`.
    pub fn new(db: HubDatabase, buckets: Arc<dyn BucketStore>, config: &Config) -> Self {
        let window_secs = i64::try_from(config.registration.window_secs).unwrap_or(i64::MAX);
        Self {
            tokens: TokenStore::new(db.clone()),
            throttle: RegistrationThrottle::new(buckets, config.registration.limit, window_secs),
            settings: Arc::new(HubSettings::from_config(config)),
            db,
        }
    }
}

/// Build the hub router.
pub fn build_router(state: AppState) -> Router {
    let me = Router::new()
        .route("/token/rotate", post(agent_me::rotate_token))
        .route("/status", put(agent_me::upsert_status))
        .route("/tasks/{external_id}", put(agent_me::upsert_task))
        .route(
            "/tasks/{external_id}/notes",
            post(agent_me::create_task_note),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_agent,
        ));

    Router::new()
        .route("/healthz", get(docs::healthz))
        .route("/api/v1/agents/register", post(registration::register))
        .nest("/api/v1/agents/me", me)
        .route("/skills/clawhq/SKILL.md", get(docs::skill_md))
        .route("/skills/clawhq/HEARTBEAT.md", get(docs::heartbeat_md))
        .layer(DefaultBodyLimit::max(state.settings.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
