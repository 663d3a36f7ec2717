use std::sync::Arc;

use crate::{auth, task::TaskState};

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use utoipa::ToSchema;

/// JSON error body shared by every endpoint: a machine-readable code plus a
/// human-readable message. Internal details never appear here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
        }
    }
}

/// Creates the API routes for the JSON task endpoints.
///
/// Every task route sits behind the middleware pair: `auth_user_middleware`
/// resolves the bearer identity, `require_auth_middleware` rejects requests
/// without one before they reach a handler.
pub fn create_api_router(auth_state: Arc<auth::AuthState>, task_state: Arc<TaskState>) -> Router {
    let tasks_router = crate::task::api::v1::create_api_router(task_state);
    let protected_routes =
        tasks_router.layer(ServiceBuilder::new().layer(from_fn(auth::require_auth_middleware)));
    Router::new()
        .merge(protected_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            auth_state,
            auth::auth_user_middleware,
        )))
}
