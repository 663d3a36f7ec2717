use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::AuthState;
use crate::config;
use crate::db::Db;
use crate::task::TaskState;

pub mod api;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::v1::list_tasks_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::get_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
    ),
    components(schemas(
        crate::task::api::v1::TaskJson,
        crate::task::api::v1::TasksResponse,
        crate::task::api::v1::PaginationJson,
        crate::task::api::v1::CreateTaskRequest,
        crate::task::api::v1::UpdateTaskRequest,
        crate::task::api::v1::StatusParam,
        crate::entities::task::TaskStatus,
        api::ErrorResponse,
    )),
    tags((name = "Tasks", description = "Owner-scoped task management endpoints"))
)]
struct ApiDoc;

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    // The connection itself is established lazily by the first request.
    let db = Db::new(&config.db_url);
    let auth_state = Arc::new(AuthState::from_config(&config));
    let task_state = Arc::new(TaskState { db });

    let app = create_app(auth_state, task_state);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Assembles the full application router. Extracted from
/// [`start_web_server`] so the endpoint tests can drive it directly.
pub fn create_app(auth_state: Arc<AuthState>, task_state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(auth_state, task_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
