use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::NotificationId;
use escola_models::auth::MessageResponse;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::notifications::model::{DeviceToken, Notification, RegisterDeviceTokenDto};
use crate::modules::notifications::service::NotificationService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/notifications/mine",
    responses(
        (status = 200, description = "The caller's 50 newest notifications", body = Vec<Notification>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_my_notifications(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let user_id = auth_user.user_id()?;
    let notifications = NotificationService::list_mine(&state.db, user_id).await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Notification not found for this user")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<NotificationId>,
) -> Result<Json<Notification>, AppError> {
    let user_id = auth_user.user_id()?;
    let notification = NotificationService::mark_read(&state.db, id, user_id).await?;
    Ok(Json(notification))
}

#[utoipa::path(
    post,
    path = "/api/notifications/device-token",
    request_body = RegisterDeviceTokenDto,
    responses(
        (status = 201, description = "Device token registered", body = DeviceToken),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Token is not a valid FCM registration token")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn register_device_token(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<RegisterDeviceTokenDto>,
) -> Result<(StatusCode, Json<DeviceToken>), AppError> {
    let user_id = auth_user.user_id()?;
    let token = NotificationService::register_device_token(&state.db, user_id, dto).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/device-token",
    responses(
        (status = 200, description = "All device tokens removed", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Notifications",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn remove_device_tokens(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let user_id = auth_user.user_id()?;
    let removed = NotificationService::remove_device_tokens(&state.db, user_id).await?;
    Ok(Json(MessageResponse {
        message: format!("{} device token(s) removed", removed),
    }))
}
