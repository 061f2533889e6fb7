use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::modules::announcements::init_announcements_router;
use crate::modules::attendance::init_attendance_router;
use crate::modules::auth::init_auth_router;
use crate::modules::calendar::init_calendar_router;
use crate::modules::classes::init_classes_router;
use crate::modules::contacts::init_contacts_router;
use crate::modules::dashboard::init_dashboard_router;
use crate::modules::events::init_events_router;
use crate::modules::grades::init_grades_router;
use crate::modules::notifications::init_notifications_router;
use crate::modules::tasks::init_tasks_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "API is running", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "success".to_string(),
        message: "Escola API running".to_string(),
    })
}

fn metrics_router(handle: Option<PrometheusHandle>) -> Router {
    Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move {
                match handle {
                    Some(handle) => handle.render().into_response(),
                    None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
                }
            }
        }),
    )
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

pub fn init_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", init_auth_router())
                .nest("/teacher/classes", init_classes_router())
                .nest("/grades", init_grades_router())
                .nest("/attendance", init_attendance_router())
                .nest("/events", init_events_router())
                .nest("/calendar", init_calendar_router())
                .nest("/announcements", init_announcements_router())
                .nest("/tasks", init_tasks_router())
                .nest("/contacts", init_contacts_router())
                .nest("/notifications", init_notifications_router())
                .nest("/dashboard", init_dashboard_router()),
        )
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
