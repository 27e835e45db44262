//! Status and task payloads pushed by authenticated agents.
//!
//! Each payload validates itself and resolves against the stored row into a
//! complete write-set for the storage layer.

use clawhq_core::Patch;
use clawhq_core::db::parse_timestamp;
use serde::Deserialize;
use serde_json::Value;

use crate::storage::{
    Agent, AgentState, AgentStatus, Task, TaskFields, TaskNoteType, TaskPriority, TaskStatus,
};

/// A payload field failed validation. The message is client-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// =========================================================================
// Agent status
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub state: Option<String>,
    #[serde(default)]
    pub current_work: Patch<String>,
    #[serde(default)]
    pub current_task_external_id: Patch<String>,
    #[serde(default)]
    pub mood: Patch<String>,
    #[serde(default)]
    pub status_note: Patch<String>,
    #[serde(default)]
    pub progress_percent: Patch<Value>,
}

impl StatusUpdate {
    /// Merge the update over the agent's stored status.
    pub fn apply(self, agent: &Agent) -> Result<AgentStatus, FieldError> {
        let state = self
            .state
            .ok_or_else(|| FieldError::new(r#"Field "state" is required."#))?;
        let state = AgentState::parse(&state)
            .ok_or_else(|| FieldError::new(r#"Field "state" is invalid."#))?;

        let mut status = agent.status();
        status.state = state;
        self.current_work.apply_to(&mut status.current_work);
        self.current_task_external_id
            .apply_to(&mut status.current_task_external_id);
        self.mood.apply_to(&mut status.mood);
        self.status_note.apply_to(&mut status.status_note);

        match self.progress_percent {
            Patch::Absent => {}
            Patch::Null => status.progress_percent = None,
            Patch::Value(value) => status.progress_percent = Some(progress_from(&value)?),
        }

        Ok(status)
    }
}

/// Accept a JSON number or numeric string, truncated and clamped to 0..=100.
#[allow(clippy::cast_possible_truncation)]
fn progress_from(value: &Value) -> Result<i64, FieldError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
    .ok_or_else(|| FieldError::new(r#"Field "progress_percent" must be a number or null."#))?;

    Ok((number.trunc() as i64).clamp(0, 100))
}

// =========================================================================
// Tasks
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<String>,
    pub requested_by: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub source_ref: Patch<String>,
    #[serde(default)]
    pub priority: Patch<String>,
    #[serde(default)]
    pub due_at: Patch<String>,
    #[serde(default)]
    pub labels: Patch<Value>,
}

impl TaskUpdate {
    /// Resolve the update against the existing task (if any) as of `now`.
    pub fn apply(self, existing: Option<&Task>, now: i64) -> Result<TaskFields, FieldError> {
        let title = trimmed(self.title);
        let status = self.status.as_deref().and_then(TaskStatus::parse);
        let requested_by = trimmed(self.requested_by);

        let (Some(title), Some(status), Some(requested_by)) = (title, status, requested_by) else {
            return Err(FieldError::new(
                r#"Fields "title", "status" (todo|doing|done) and "requested_by" are required."#,
            ));
        };

        let mut fields = existing.map_or_else(
            || TaskFields {
                title: String::new(),
                description: None,
                status: TaskStatus::Todo,
                requested_by: String::new(),
                priority: None,
                due_at: None,
                labels: Vec::new(),
                source_ref: None,
                started_at: None,
                completed_at: None,
            },
            fields_of,
        );
        let previous = existing.map(Task::status);

        fields.title = title;
        fields.requested_by = requested_by;
        self.description.apply_to(&mut fields.description);
        self.source_ref.apply_to(&mut fields.source_ref);

        match self.priority {
            Patch::Absent => {}
            Patch::Null => fields.priority = None,
            Patch::Value(p) => {
                fields.priority = Some(
                    TaskPriority::parse(&p)
                        .ok_or_else(|| FieldError::new(r#"Field "priority" is invalid."#))?,
                );
            }
        }

        match self.due_at {
            Patch::Absent => {}
            Patch::Null => fields.due_at = None,
            Patch::Value(d) if d.trim().is_empty() => fields.due_at = None,
            Patch::Value(d) => {
                fields.due_at = Some(parse_timestamp(&d).ok_or_else(|| {
                    FieldError::new(r#"Field "due_at" must be a valid ISO date."#)
                })?);
            }
        }

        match self.labels {
            Patch::Absent => {}
            Patch::Null => return Err(labels_error()),
            Patch::Value(value) => fields.labels = normalize_labels(&value)?,
        }

        transition(&mut fields, previous, status, now);
        Ok(fields)
    }
}

fn fields_of(task: &Task) -> TaskFields {
    TaskFields {
        title: task.title.clone(),
        description: task.description.clone(),
        status: task.status(),
        requested_by: task.requested_by.clone(),
        priority: task.priority(),
        due_at: task.due_at,
        labels: task.labels(),
        source_ref: task.source_ref.clone(),
        started_at: task.started_at,
        completed_at: task.completed_at,
    }
}

/// Apply a status change and its timestamp side effects.
fn transition(fields: &mut TaskFields, previous: Option<TaskStatus>, next: TaskStatus, now: i64) {
    fields.status = next;
    match next {
        TaskStatus::Doing => {
            fields.started_at.get_or_insert(now);
        }
        TaskStatus::Done => {
            fields.completed_at = Some(now);
            fields.started_at.get_or_insert(now);
        }
        TaskStatus::Todo => {}
    }
    if previous == Some(TaskStatus::Done) && next != TaskStatus::Done {
        fields.completed_at = None;
    }
}

fn labels_error() -> FieldError {
    FieldError::new(r#"Field "labels" must be an array of strings."#)
}

/// Trim labels, drop empties, and de-duplicate keeping first occurrence.
pub fn normalize_labels(value: &Value) -> Result<Vec<String>, FieldError> {
    let items = value.as_array().ok_or_else(labels_error)?;
    let mut labels: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let label = item.as_str().ok_or_else(labels_error)?.trim();
        if !label.is_empty() && !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }
    Ok(labels)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =========================================================================
// Task notes
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NoteInput {
    pub note: Option<String>,
    #[serde(rename = "type")]
    pub note_type: Option<String>,
}

impl NoteInput {
    pub fn validate(self) -> Result<(TaskNoteType, String), FieldError> {
        let note =
            trimmed(self.note).ok_or_else(|| FieldError::new(r#"Field "note" is required."#))?;
        let note_type = match self.note_type {
            None => TaskNoteType::Progress,
            Some(t) => TaskNoteType::parse(&t)
                .ok_or_else(|| FieldError::new(r#"Field "type" is invalid."#))?,
        };
        Ok((note_type, note))
    }
}
