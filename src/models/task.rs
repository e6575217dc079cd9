use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Priority of a task. Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Lifecycle status of a task. Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Not started yet.
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

/// Payload for `POST /api/tasks`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskCreate {
    /// Between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// At most 1000 characters.
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: TaskPriority,

    #[serde(default)]
    pub status: TaskStatus,

    pub due_date: Option<NaiveDate>,
}

/// Payload for `PUT /api/tasks/{id}`. Absent fields keep their stored value.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,

    pub status: Option<TaskStatus>,

    pub due_date: Option<NaiveDate>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }
}

/// Payload for `PATCH /api/tasks/{id}/status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
}

/// A task as stored in the database and returned by the API.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owner of the task.
    pub user_id: i32,
}

/// Query parameters accepted by `GET /api/tasks`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
}
