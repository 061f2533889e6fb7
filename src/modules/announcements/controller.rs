use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::AnnouncementId;
use escola_models::auth::MessageResponse;
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireStaff};
use crate::modules::announcements::model::{
    Announcement, AnnouncementFilterParams, CreateAnnouncementDto, UpdateAnnouncementDto,
};
use crate::modules::announcements::service::AnnouncementService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/announcements",
    request_body = CreateAnnouncementDto,
    responses(
        (status = 201, description = "Announcement published", body = Announcement),
        (status = 400, description = "Recipients missing or with the wrong role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Class not found"),
        (status = 422, description = "Validation error")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_announcement(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateAnnouncementDto>,
) -> Result<(StatusCode, Json<Announcement>), AppError> {
    let announcement =
        AnnouncementService::create_announcement(&state.db, auth_user.caller()?, dto).await?;
    Ok((StatusCode::CREATED, Json(announcement)))
}

#[utoipa::path(
    get,
    path = "/api/announcements",
    params(AnnouncementFilterParams),
    responses(
        (status = 200, description = "Announcements visible to the caller", body = Vec<Announcement>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_announcements(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<AnnouncementFilterParams>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let announcements =
        AnnouncementService::list_announcements(&state.db, auth_user.caller()?, filters).await?;
    Ok(Json(announcements))
}

#[utoipa::path(
    post,
    path = "/api/announcements/{id}/read",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Marked as read", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_announcement_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<MessageResponse>, AppError> {
    AnnouncementService::mark_read(&state.db, auth_user.caller()?, id).await?;
    Ok(Json(MessageResponse {
        message: "Announcement marked as read".to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/api/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    request_body = UpdateAnnouncementDto,
    responses(
        (status = 200, description = "Announcement updated", body = Announcement),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_announcement(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<AnnouncementId>,
    ValidatedJson(dto): ValidatedJson<UpdateAnnouncementDto>,
) -> Result<Json<Announcement>, AppError> {
    let announcement =
        AnnouncementService::update_announcement(&state.db, auth_user.caller()?, id, dto).await?;
    Ok(Json(announcement))
}

#[utoipa::path(
    delete,
    path = "/api/announcements/{id}",
    params(("id" = Uuid, Path, description = "Announcement ID")),
    responses(
        (status = 200, description = "Announcement removed", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Announcement not found")
    ),
    tag = "Announcements",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_announcement(
    State(state): State<AppState>,
    RequireStaff(_auth_user): RequireStaff,
    Path(id): Path<AnnouncementId>,
) -> Result<Json<MessageResponse>, AppError> {
    AnnouncementService::delete_announcement(&state.db, id).await?;
    Ok(Json(MessageResponse {
        message: "Announcement removed".to_string(),
    }))
}
