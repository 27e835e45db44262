//! Data models for `ClawHQ` hub storage.

/// Maximum stored length of a normalized agent name.
pub const MAX_AGENT_NAME_LEN: usize = 120;

/// Maximum stored length of an agent display name.
pub const MAX_DISPLAY_NAME_LEN: usize = 160;

/// Case-fold and trim an agent name into its unique stored form.
pub fn normalize_agent_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Declares a closed set of lowercase wire values backed by a `TEXT` column.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Self-reported agent activity.
    AgentState { Idle => "idle", Working => "working", Blocked => "blocked" }
}

wire_enum! {
    TaskStatus { Todo => "todo", Doing => "doing", Done => "done" }
}

wire_enum! {
    TaskPriority { Low => "low", Normal => "normal", High => "high", Urgent => "urgent" }
}

wire_enum! {
    TaskNoteType {
        Progress => "progress",
        Blocker => "blocker",
        Decision => "decision",
        System => "system",
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub api_token_hash: Option<String>,
    pub state: String,
    pub current_work: Option<String>,
    pub current_task_external_id: Option<String>,
    pub mood: Option<String>,
    pub status_note: Option<String>,
    pub progress_percent: Option<i64>,
    /// JSON document, replaced wholesale on registration.
    pub metadata: String,
    pub last_seen_at: Option<i64>,
    pub registered_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Agent {
    pub fn state(&self) -> AgentState {
        AgentState::parse(&self.state).unwrap_or(AgentState::Idle)
    }

    /// The status columns as currently stored.
    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            state: self.state(),
            current_work: self.current_work.clone(),
            current_task_external_id: self.current_task_external_id.clone(),
            mood: self.mood.clone(),
            status_note: self.status_note.clone(),
            progress_percent: self.progress_percent,
        }
    }
}

/// Write-set for an agent status update. Never touches the token hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStatus {
    pub state: AgentState,
    pub current_work: Option<String>,
    pub current_task_external_id: Option<String>,
    pub mood: Option<String>,
    pub status_note: Option<String>,
    pub progress_percent: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub agent_id: i64,
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub requested_by: String,
    pub priority: Option<String>,
    pub due_at: Option<i64>,
    /// JSON array of strings.
    pub labels: String,
    pub source_ref: Option<String>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn status(&self) -> TaskStatus {
        TaskStatus::parse(&self.status).unwrap_or(TaskStatus::Todo)
    }

    pub fn priority(&self) -> Option<TaskPriority> {
        self.priority.as_deref().and_then(TaskPriority::parse)
    }

    pub fn labels(&self) -> Vec<String> {
        serde_json::from_str(&self.labels).unwrap_or_default()
    }
}

/// Full write-set for a task upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub requested_by: String,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<i64>,
    pub labels: Vec<String>,
    pub source_ref: Option<String>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskNote {
    pub id: i64,
    pub task_id: i64,
    #[sqlx(rename = "type")]
    pub note_type: String,
    pub note: String,
    pub created_at: i64,
}

impl TaskNote {
    pub fn note_type(&self) -> TaskNoteType {
        TaskNoteType::parse(&self.note_type).unwrap_or(TaskNoteType::Progress)
    }
}
