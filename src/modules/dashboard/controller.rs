use axum::{Json, extract::State};
use chrono::{Datelike, Local, Utc};
use escola_core::AppError;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::dashboard::model::{DashboardResponse, DashboardUser};
use crate::modules::dashboard::service::DashboardService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Payload shaped by the caller's role", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let caller = auth_user.caller()?;
    let data = DashboardService::build(&state.db, caller, Local::now().month()).await?;

    Ok(Json(DashboardResponse {
        user: DashboardUser {
            id: caller.id,
            name: auth_user.name().to_string(),
            email: auth_user.email().to_string(),
            role: caller.role,
        },
        timestamp: Utc::now(),
        data,
    }))
}
