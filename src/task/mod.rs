use crate::db::Db;
use crate::entities::task::{self, TaskStatus};
use sea_orm::prelude::DateTimeUtc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;

pub mod api;

/// Maximum length of a task title, in characters.
pub const TITLE_MAX_LEN: usize = 100;
/// Maximum length of a task description, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// A task owned by a single user.
#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: i32,
    owner_id: String,
    title: String,
    description: String,
    status: TaskStatus,
    created_at: DateTimeUtc,
    updated_at: DateTimeUtc,
}

impl Task {
    /// Returns the ID of the task.
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Returns the identity of the owning user.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Returns the title of the task.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description of the task.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the status of the task.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTimeUtc {
        self.created_at
    }

    /// Returns the timestamp of the last mutation.
    pub fn updated_at(&self) -> DateTimeUtc {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            owner_id: model.owner_id,
            title: model.title,
            description: model.description,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    /// Represents a rejected write: missing, blank or over-length field.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Represents a task that does not exist under the caller's ownership.
    /// Tasks belonging to other owners deliberately surface as this variant.
    #[error("Task with ID {0} not found")]
    NotFound(i32),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Filter criteria for listing tasks. `status: None` means "all".
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// Metadata describing the position of a returned page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// Shared state for task routes.
#[derive(Clone)]
pub struct TaskState {
    pub db: Db,
}

pub struct TaskService<'a> {
    db: &'a sea_orm::DatabaseConnection,
}

impl TaskService<'_> {
    pub fn new(db: &sea_orm::DatabaseConnection) -> TaskService {
        TaskService { db }
    }

    /// Lists the caller's tasks, filtered and paginated.
    ///
    /// Results are restricted to `owner_id`, sorted newest-first by creation
    /// time (ties broken by insertion order), and windowed by `pagination`.
    /// An empty result is an empty page, never an error.
    #[tracing::instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        owner_id: &str,
        filter: &TaskFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Task>, PageInfo), TaskServiceError> {
        let page = pagination.page.max(1);
        // Both values are client-supplied; cap the window to what the store's
        // signed 64-bit LIMIT/OFFSET can express instead of overflowing.
        let limit = pagination.limit.clamp(1, i64::MAX as u64);
        let offset = (page - 1).saturating_mul(limit).min(i64::MAX as u64);

        let query = scoped_query(owner_id, filter);
        let total = query.clone().count(self.db).await?;
        let tasks = query
            .order_by_desc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();

        let page_info = PageInfo {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        };
        Ok((tasks, page_info))
    }

    /// Creates a new task owned by `owner_id`.
    ///
    /// Title and description are trimmed and validated before the write;
    /// `status` defaults to pending when omitted. Timestamps are set here.
    #[tracing::instrument(skip(self))]
    pub async fn create_task(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
        status: Option<TaskStatus>,
    ) -> Result<Task, TaskServiceError> {
        let title = validate_field(title, "Title", TITLE_MAX_LEN)?;
        let description = validate_field(description, "Description", DESCRIPTION_MAX_LEN)?;

        let now = chrono::Utc::now();
        let active_model = task::ActiveModel {
            owner_id: ActiveValue::Set(owner_id.to_string()),
            title: ActiveValue::Set(title),
            description: ActiveValue::Set(description),
            status: ActiveValue::Set(status.unwrap_or_default()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        let created_model = active_model.insert(self.db).await?;
        Ok(Task::from(created_model))
    }

    /// Retrieves a single task under the caller's ownership.
    #[tracing::instrument(skip(self))]
    pub async fn get_task(&self, owner_id: &str, id: i32) -> Result<Task, TaskServiceError> {
        let model = self.find_owned(owner_id, id).await?;
        Ok(Task::from(model))
    }

    /// Replaces title, description and status of one of the caller's tasks
    /// and refreshes `updated_at`. A task owned by someone else is NotFound.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        owner_id: &str,
        id: i32,
        title: &str,
        description: &str,
        status: TaskStatus,
    ) -> Result<Task, TaskServiceError> {
        let task_to_update = self.find_owned(owner_id, id).await?;

        let title = validate_field(title, "Title", TITLE_MAX_LEN)?;
        let description = validate_field(description, "Description", DESCRIPTION_MAX_LEN)?;

        let mut active_model: task::ActiveModel = task_to_update.into();
        active_model.title = ActiveValue::Set(title);
        active_model.description = ActiveValue::Set(description);
        active_model.status = ActiveValue::Set(status);
        active_model.updated_at = ActiveValue::Set(chrono::Utc::now());
        let updated_model = active_model.update(self.db).await?;

        Ok(Task::from(updated_model))
    }

    /// Deletes one of the caller's tasks. Deletion is permanent; a repeat
    /// delete of the same id is NotFound.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, owner_id: &str, id: i32) -> Result<(), TaskServiceError> {
        let task_to_delete = self.find_owned(owner_id, id).await?;
        task_to_delete.delete(self.db).await?;
        Ok(())
    }

    /// Owner-scoped lookup: a matching id under a different owner is treated
    /// as absent so existence is not leaked across owners.
    async fn find_owned(&self, owner_id: &str, id: i32) -> Result<task::Model, TaskServiceError> {
        task::Entity::find_by_id(id)
            .filter(task::Column::OwnerId.eq(owner_id))
            .one(self.db)
            .await?
            .ok_or(TaskServiceError::NotFound(id))
    }
}

/// Translates the filter criteria into a store query, always scoped to the
/// owner first.
fn scoped_query(owner_id: &str, filter: &TaskFilter) -> Select<task::Entity> {
    let mut query = task::Entity::find().filter(task::Column::OwnerId.eq(owner_id));

    if let Some(status) = filter.status {
        query = query.filter(task::Column::Status.eq(status));
    }

    if let Some(search) = filter.search.as_deref() {
        if !search.is_empty() {
            // Case-insensitive substring match over title OR description.
            let pattern = format!("%{}%", search.to_lowercase());
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(task::Column::Title)))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(task::Column::Description)))
                            .like(pattern),
                    ),
            );
        }
    }

    query
}

/// Validates a required text field: trims whitespace, rejects blank input and
/// input longer than `max_len` characters. Violations are rejected, never
/// truncated.
fn validate_field(value: &str, name: &str, max_len: usize) -> Result<String, TaskServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskServiceError::Validation(format!("{name} is required")));
    }
    if trimmed.chars().count() > max_len {
        return Err(TaskServiceError::Validation(format!(
            "{name} cannot exceed {max_len} characters"
        )));
    }
    Ok(trimmed.to_string())
}
