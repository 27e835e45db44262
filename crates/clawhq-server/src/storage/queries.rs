//! Agent identity queries for the `ClawHQ` hub.

use clawhq_core::Patch;
use clawhq_core::db::unix_timestamp;

use super::db::{DatabaseError, HubDatabase};
use super::models::{Agent, AgentStatus, normalize_agent_name};

impl HubDatabase {
    // =========================================================================
    // Identity queries
    // =========================================================================

    /// Fetch the agent with the given name, creating it on first sight.
    ///
    /// The insert is a no-op when the normalized name already exists, so two
    /// concurrent registrations of the same name resolve to one row.
    pub async fn create_or_get_agent(&self, name: &str) -> Result<Agent, DatabaseError> {
        let name = normalize_agent_name(name);
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO agents (name, registered_at, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT(name) DO NOTHING",
        )
        .bind(&name)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_agent_by_name(&name)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Agent with name {name}")))
    }

    /// Get an agent by ID.
    pub async fn get_agent(&self, id: i64) -> Result<Agent, DatabaseError> {
        self.find_agent(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Agent {id}")))
    }

    pub async fn find_agent(&self, id: i64) -> Result<Option<Agent>, DatabaseError> {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(agent)
    }

    /// Look up an agent by name; the name is normalized first.
    pub async fn find_agent_by_name(&self, name: &str) -> Result<Option<Agent>, DatabaseError> {
        let agent = sqlx::query_as::<_, Agent>("SELECT * FROM agents WHERE name = ?")
            .bind(normalize_agent_name(name))
            .fetch_optional(self.pool())
            .await?;

        Ok(agent)
    }

    /// Apply registration-time profile fields.
    ///
    /// `display_name` follows patch semantics; `metadata`, when given,
    /// replaces the stored document wholesale.
    pub async fn update_agent_profile(
        &self,
        id: i64,
        display_name: Patch<String>,
        metadata: Option<&str>,
    ) -> Result<(), DatabaseError> {
        if let Some(display_name) = display_name.into_update() {
            sqlx::query("UPDATE agents SET display_name = ? WHERE id = ?")
                .bind(display_name)
                .bind(id)
                .execute(self.pool())
                .await?;
        }

        if let Some(metadata) = metadata {
            sqlx::query("UPDATE agents SET metadata = ? WHERE id = ?")
                .bind(metadata)
                .bind(id)
                .execute(self.pool())
                .await?;
        }

        Ok(())
    }

    // =========================================================================
    // Token hash
    // =========================================================================

    /// Replace the agent's stored token hash. Single-row update, last write wins.
    pub async fn set_token_hash(&self, id: i64, hash: &str) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE agents SET api_token_hash = ? WHERE id = ?")
            .bind(hash)
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Agent {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Presence and status
    // =========================================================================

    /// Mark the agent as seen at `at`.
    pub async fn touch_agent(&self, id: i64, at: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE agents SET last_seen_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Write the status columns and mark the agent as seen at `at`.
    pub async fn update_agent_status(
        &self,
        id: i64,
        status: &AgentStatus,
        at: i64,
    ) -> Result<Agent, DatabaseError> {
        sqlx::query(
            "UPDATE agents SET state = ?, current_work = ?, current_task_external_id = ?, mood = ?, status_note = ?, progress_percent = ?, last_seen_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.state.as_str())
        .bind(&status.current_work)
        .bind(&status.current_task_external_id)
        .bind(&status.mood)
        .bind(&status.status_note)
        .bind(status.progress_percent)
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_agent(id).await
    }
}
