//! Task and task note queries for the `ClawHQ` hub.

use super::db::{DatabaseError, HubDatabase};
use super::models::{Task, TaskFields, TaskNote, TaskNoteType};

impl HubDatabase {
    // =========================================================================
    // Task queries
    // =========================================================================

    /// Find a task by its agent-scoped external ID.
    pub async fn find_task(
        &self,
        agent_id: i64,
        external_id: &str,
    ) -> Result<Option<Task>, DatabaseError> {
        let task =
            sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE agent_id = ? AND external_id = ?")
                .bind(agent_id)
                .bind(external_id.trim())
                .fetch_optional(self.pool())
                .await?;

        Ok(task)
    }

    /// Insert or fully overwrite the task keyed by `(agent_id, external_id)`.
    pub async fn upsert_task(
        &self,
        agent_id: i64,
        external_id: &str,
        fields: &TaskFields,
        now: i64,
    ) -> Result<Task, DatabaseError> {
        let external_id = external_id.trim();
        let labels = serde_json::to_string(&fields.labels)
            .map_err(|e| DatabaseError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO tasks (agent_id, external_id, title, description, status, requested_by, priority, due_at, labels, source_ref, started_at, completed_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(agent_id, external_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                status = excluded.status,
                requested_by = excluded.requested_by,
                priority = excluded.priority,
                due_at = excluded.due_at,
                labels = excluded.labels,
                source_ref = excluded.source_ref,
                started_at = excluded.started_at,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at",
        )
        .bind(agent_id)
        .bind(external_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(fields.status.as_str())
        .bind(&fields.requested_by)
        .bind(fields.priority.map(|p| p.as_str()))
        .bind(fields.due_at)
        .bind(labels)
        .bind(&fields.source_ref)
        .bind(fields.started_at)
        .bind(fields.completed_at)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.find_task(agent_id, external_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Task {external_id}")))
    }

    /// List an agent's tasks, most recently updated first.
    #[cfg(test)]
    pub async fn list_tasks(&self, agent_id: i64) -> Result<Vec<Task>, DatabaseError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE agent_id = ? ORDER BY updated_at DESC, id DESC",
        )
        .bind(agent_id)
        .fetch_all(self.pool())
        .await?;

        Ok(tasks)
    }

    pub async fn touch_task(&self, task_id: i64, at: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE tasks SET updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(task_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    // =========================================================================
    // Note queries
    // =========================================================================

    /// Append a note to a task.
    pub async fn create_task_note(
        &self,
        task_id: i64,
        note_type: TaskNoteType,
        note: &str,
        at: i64,
    ) -> Result<TaskNote, DatabaseError> {
        let result =
            sqlx::query("INSERT INTO task_notes (task_id, type, note, created_at) VALUES (?, ?, ?, ?)")
                .bind(task_id)
                .bind(note_type.as_str())
                .bind(note)
                .bind(at)
                .execute(self.pool())
                .await?;

        let id = result.last_insert_rowid();
        sqlx::query_as::<_, TaskNote>("SELECT * FROM task_notes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Task note {id}")))
    }

    /// List a task's notes, newest first.
    #[cfg(test)]
    pub async fn list_task_notes(&self, task_id: i64) -> Result<Vec<TaskNote>, DatabaseError> {
        let notes = sqlx::query_as::<_, TaskNote>(
            "SELECT * FROM task_notes WHERE task_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(task_id)
        .fetch_all(self.pool())
        .await?;

        Ok(notes)
    }
}
