//! Per-agent hashed token secrets.
//!
//! Argon2 runs on the blocking pool so request workers stay responsive.

use tracing::{debug, error};

use super::secret::{self, SecretError};
use super::token::{self, IssuedToken};
use crate::storage::{Agent, DatabaseError, HubDatabase};

#[derive(Debug, thiserror::Error)]
pub enum TokenStoreError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("hashing worker failed: {0}")]
    Worker(String),
}

#[derive(Clone)]
pub struct TokenStore {
    db: HubDatabase,
}

impl TokenStore {
    pub const fn new(db: HubDatabase) -> Self {
        Self { db }
    }

    /// Mint a token for the agent and make it the only valid one.
    pub async fn issue(&self, agent_id: i64) -> Result<IssuedToken, TokenStoreError> {
        let issued = token::issue(agent_id);
        self.store_secret(agent_id, issued.secret.clone()).await?;
        debug!(agent_id, "Issued agent token");
        Ok(issued)
    }

    /// Hash `raw_secret` and overwrite the agent's stored hash.
    pub async fn store_secret(
        &self,
        agent_id: i64,
        raw_secret: String,
    ) -> Result<(), TokenStoreError> {
        let hash = tokio::task::spawn_blocking(move || secret::hash_secret(&raw_secret))
            .await
            .map_err(|e| TokenStoreError::Worker(e.to_string()))??;

        self.db.set_token_hash(agent_id, &hash).await?;
        Ok(())
    }

    /// Check `raw_secret` against the agent's current hash. Never errors.
    pub async fn verify(&self, agent: &Agent, raw_secret: String) -> bool {
        let stored = agent.api_token_hash.clone();
        match tokio::task::spawn_blocking(move || {
            secret::verify_secret(&raw_secret, stored.as_deref())
        })
        .await
        {
            Ok(valid) => valid,
            Err(e) => {
                error!(error = %e, agent_id = agent.id, "Token verification worker failed");
                false
            }
        }
    }

    /// Resolve a presented bearer token to its agent.
    ///
    /// Malformed tokens, unknown agents, and wrong secrets all yield
    /// `Ok(None)`. Only storage failures surface as errors.
    pub async fn authenticate(&self, presented: &str) -> Result<Option<Agent>, TokenStoreError> {
        let Some(parsed) = token::parse(presented) else {
            return Ok(None);
        };
        let Some(agent) = self.db.find_agent(parsed.agent_id).await? else {
            return Ok(None);
        };
        if self.verify(&agent, parsed.secret).await {
            Ok(Some(agent))
        } else {
            Ok(None)
        }
    }
}
