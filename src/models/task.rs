use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::user::not_blank;

/// Represents a task entity as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    /// Identifier of the user who created, and exclusively owns, the task.
    pub creator: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input structure for creating a task. Unknown keys are ignored.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(custom = "not_blank")]
    pub description: String,
    /// Defaults to `false` when omitted.
    pub completed: Option<bool>,
}

/// Task patch. Only `description` and `completed` may be present.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskUpdate {
    #[validate(custom = "not_blank")]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub const ALLOWED_FIELDS: &'static [&'static str] = &["description", "completed"];
}

impl Task {
    /// Creates a new `Task` owned by `creator`, trimming the description.
    pub fn new(input: TaskInput, creator: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: input.description.trim().to_string(),
            completed: input.completed.unwrap_or(false),
            creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated patch in place and bumps `updated_at`.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

/// Raw query parameters accepted by `GET /tasks`.
///
/// Everything is kept as text so malformed values degrade instead of failing
/// the request. See [`TaskQuery::to_filter`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub completed: Option<String>,
    pub sort_by: Option<String>,
    pub skip: Option<String>,
    pub limit: Option<String>,
}

/// Collects decoded query pairs. The first occurrence of a repeated key wins
/// and unknown keys are ignored.
impl FromIterator<(String, String)> for TaskQuery {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut query = TaskQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "completed" => &mut query.completed,
                "sortBy" => &mut query.sort_by,
                "skip" => &mut query.skip,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    Description,
    Completed,
    CreatedAt,
    UpdatedAt,
}

impl TaskSortField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "description" => Some(Self::Description),
            "completed" => Some(Self::Completed),
            "createdAt" | "created_at" => Some(Self::CreatedAt),
            "updatedAt" | "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Completed => "completed",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub direction: SortDirection,
}

/// Parsed listing options. The creator scope is not part of it: stores always
/// take the owner separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub sort: Option<TaskSort>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl TaskQuery {
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            completed: self
                .completed
                .as_deref()
                .filter(|value| !value.is_empty())
                .map(|value| value == "true"),
            sort: self.sort_by.as_deref().and_then(parse_sort),
            skip: self
                .skip
                .as_deref()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|skip| *skip > 0),
            limit: self
                .limit
                .as_deref()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|limit| *limit > 0),
        }
    }
}

fn parse_sort(raw: &str) -> Option<TaskSort> {
    let mut parts = raw.splitn(2, ':');
    let field = TaskSortField::parse(parts.next()?.trim())?;
    let direction = match parts.next().map(|d| d.trim().to_lowercase()) {
        Some(d) if d == "desc" => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    Some(TaskSort { field, direction })
}
