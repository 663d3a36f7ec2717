use crate::auth::CurrentUser;
use crate::db::DbError;
use crate::entities::task::TaskStatus;
use crate::task::{PageInfo, Pagination, Task, TaskFilter, TaskService, TaskServiceError, TaskState};
use crate::web::api::ErrorResponse;
use axum::{
    Extension, Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Task for API responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique identifier for the task
    id: i32,
    /// Title of the task
    title: String,
    /// Longer free-text description
    description: String,
    /// Current status, `pending` or `done`
    status: TaskStatus,
    /// Identity of the owning user
    owner_id: String,
    /// Creation timestamp (RFC 3339)
    created_at: chrono::DateTime<chrono::Utc>,
    /// Timestamp of the last mutation (RFC 3339)
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().to_string(),
            status: task.status(),
            owner_id: task.owner_id().to_string(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Pagination metadata returned alongside a task page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationJson {
    /// 1-based page number
    page: u64,
    /// Page size
    limit: u64,
    /// Total number of matching tasks
    total: u64,
    /// Total number of pages
    pages: u64,
}

impl From<PageInfo> for PaginationJson {
    fn from(info: PageInfo) -> Self {
        Self {
            page: info.page,
            limit: info.limit,
            total: info.total,
            pages: info.pages,
        }
    }
}

/// API response for listing tasks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TasksResponse {
    /// One page of the caller's tasks, newest first
    tasks: Vec<TaskJson>,
    /// Page position metadata
    pagination: PaginationJson,
}

/// Status filter accepted by the list endpoint.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusParam {
    All,
    Pending,
    Done,
}

impl StatusParam {
    fn into_filter(self) -> Option<TaskStatus> {
        match self {
            StatusParam::All => None,
            StatusParam::Pending => Some(TaskStatus::Pending),
            StatusParam::Done => Some(TaskStatus::Done),
        }
    }
}

/// Query parameters for listing tasks.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListTasksQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_limit")]
    limit: u64,
    #[serde(default)]
    status: Option<StatusParam>,
    #[serde(default)]
    search: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    10
}

/// JSON request payload for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
}

/// JSON request payload for updating a task. All three fields are replaced.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
}

/// Error type for task handler operations, mapped onto the HTTP status and
/// JSON error body surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error(transparent)]
    Connection(#[from] DbError),
    #[error(transparent)]
    Service(#[from] TaskServiceError),
}

impl IntoResponse for TaskApiError {
    fn into_response(self) -> axum::response::Response {
        let (status_code, error, message) = match self {
            TaskApiError::Service(TaskServiceError::Validation(message)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            TaskApiError::Service(TaskServiceError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Task not found".to_string(),
            ),
            TaskApiError::Service(TaskServiceError::Database(err)) => {
                // Store failures are logged server-side, never exposed.
                tracing::error!("database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred while processing your request. Please try again later.".to_string(),
                )
            }
            TaskApiError::Connection(err) => {
                tracing::error!("connection error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred while processing your request. Please try again later.".to_string(),
                )
            }
        };

        (status_code, Json(ErrorResponse::new(error, message))).into_response()
    }
}

/// JSON body extractor that reports deserialization failures through the
/// same error envelope as every other validation failure, instead of
/// axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = TaskApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| TaskServiceError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string extractor with the same envelope-preserving rejection as
/// [`ApiJson`].
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = TaskApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| TaskServiceError::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// Handler for GET /tasks - Returns one page of the caller's tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number, default 1"),
        ("limit" = Option<u64>, Query, description = "Page size, default 10"),
        ("status" = Option<StatusParam>, Query, description = "Filter by status: pending, done or all"),
        ("search" = Option<String>, Query, description = "Case-insensitive substring match on title or description")
    ),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<ListTasksQuery>,
) -> Result<Json<TasksResponse>, TaskApiError> {
    let db = state.db.get().await?;
    let service = TaskService::new(db);

    let filter = TaskFilter {
        status: query.status.and_then(StatusParam::into_filter),
        search: query.search,
    };
    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };

    let (tasks, page_info) = service
        .list_tasks(&user.user_id, &filter, pagination)
        .await?;

    Ok(Json(TasksResponse {
        tasks: tasks.into_iter().map(TaskJson::from).collect(),
        pagination: PaginationJson::from(page_info),
    }))
}

/// Handler for POST /tasks - Creates a task owned by the caller.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), TaskApiError> {
    let db = state.db.get().await?;
    let service = TaskService::new(db);

    let task = service
        .create_task(
            &user.user_id,
            payload.title.as_deref().unwrap_or(""),
            payload.description.as_deref().unwrap_or(""),
            payload.status,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(TaskJson::from(task))))
}

/// Handler for GET /tasks/{id} - Returns a single task under the caller's
/// ownership.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    responses(
        (status = 200, description = "Task found", body = TaskJson),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
        (status = 404, description = "No such task under the caller's ownership", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let db = state.db.get().await?;
    let service = TaskService::new(db);
    let task = service.get_task(&user.user_id, id).await?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for PUT /tasks/{id} - Replaces title, description and status.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    put,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
        (status = 404, description = "No such task under the caller's ownership", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
    ApiJson(payload): ApiJson<UpdateTaskRequest>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let db = state.db.get().await?;
    let service = TaskService::new(db);

    let status = payload
        .status
        .ok_or_else(|| TaskServiceError::Validation("Status is required".to_string()))?;
    let task = service
        .update_task(
            &user.user_id,
            id,
            payload.title.as_deref().unwrap_or(""),
            payload.description.as_deref().unwrap_or(""),
            status,
        )
        .await?;

    Ok(Json(TaskJson::from(task)))
}

/// Handler for DELETE /tasks/{id} - Permanently deletes one of the caller's
/// tasks. Responds 204 with no body.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task identifier")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Caller is not authenticated", body = ErrorResponse),
        (status = 404, description = "No such task under the caller's ownership", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    let db = state.db.get().await?;
    let service = TaskService::new(db);
    service.delete_task(&user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler)
                .put(update_task_handler)
                .delete(delete_task_handler),
        )
        .with_state(state)
}
