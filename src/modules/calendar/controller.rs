use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::auth::MessageResponse;
use escola_models::{CalendarEntryId, ClassId};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireStaff};
use crate::modules::calendar::model::{
    CalendarEntry, CalendarFilterParams, CreateCalendarEntryDto, UpdateCalendarEntryDto,
};
use crate::modules::calendar::service::CalendarService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/calendar",
    request_body = CreateCalendarEntryDto,
    responses(
        (status = 201, description = "Calendar entry created", body = CalendarEntry),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Class not found"),
        (status = 422, description = "End before start or invalid recurrence")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_calendar_entry(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateCalendarEntryDto>,
) -> Result<(StatusCode, Json<CalendarEntry>), AppError> {
    let entry = CalendarService::create_entry(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/api/calendar",
    params(CalendarFilterParams),
    responses(
        (status = 200, description = "Active calendar entries", body = Vec<CalendarEntry>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_calendar_entries(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<CalendarFilterParams>,
) -> Result<Json<Vec<CalendarEntry>>, AppError> {
    let entries = CalendarService::list_entries(&state.db, auth_user.caller()?, filters).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/calendar/class/{class_id}",
    params(
        ("class_id" = Uuid, Path, description = "Class ID"),
        CalendarFilterParams
    ),
    responses(
        (status = 200, description = "Active entries of the class", body = Vec<CalendarEntry>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_class_calendar(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Path(class_id): Path<ClassId>,
    Query(filters): Query<CalendarFilterParams>,
) -> Result<Json<Vec<CalendarEntry>>, AppError> {
    let entries =
        CalendarService::list_for_class(&state.db, class_id, filters.start, filters.end).await?;
    Ok(Json(entries))
}

#[utoipa::path(
    put,
    path = "/api/calendar/{id}",
    params(("id" = Uuid, Path, description = "Calendar entry ID")),
    request_body = UpdateCalendarEntryDto,
    responses(
        (status = 200, description = "Calendar entry updated", body = CalendarEntry),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Entry or class not found"),
        (status = 422, description = "End before start or invalid recurrence")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_calendar_entry(
    State(state): State<AppState>,
    RequireStaff(_auth_user): RequireStaff,
    Path(id): Path<CalendarEntryId>,
    ValidatedJson(dto): ValidatedJson<UpdateCalendarEntryDto>,
) -> Result<Json<CalendarEntry>, AppError> {
    let entry = CalendarService::update_entry(&state.db, id, dto).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    delete,
    path = "/api/calendar/{id}",
    params(("id" = Uuid, Path, description = "Calendar entry ID")),
    responses(
        (status = 200, description = "Calendar entry removed", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers"),
        (status = 404, description = "Entry not found")
    ),
    tag = "Calendar",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_calendar_entry(
    State(state): State<AppState>,
    RequireStaff(_auth_user): RequireStaff,
    Path(id): Path<CalendarEntryId>,
) -> Result<Json<MessageResponse>, AppError> {
    CalendarService::delete_entry(&state.db, id).await?;
    Ok(Json(MessageResponse {
        message: "Calendar entry removed".to_string(),
    }))
}
