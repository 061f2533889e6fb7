use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use escola_core::AppError;
use escola_models::EventId;
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireStaff};
use crate::modules::events::model::{
    CreateEventDto, Event, EventFilterParams, PeriodEventsResponse, PeriodFilterParams,
    PeriodKind, UpdateEventDto,
};
use crate::modules::events::service::EventService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventDto,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Unknown class"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers create events"),
        (status = 422, description = "End before start or missing subject")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_event(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateEventDto>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = EventService::create_event(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventFilterParams),
    responses(
        (status = 200, description = "Events ordered by start", body = Vec<Event>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<EventFilterParams>,
) -> Result<Json<Vec<Event>>, AppError> {
    let events = EventService::list_events(&state.db, auth_user.caller()?, filters).await?;
    Ok(Json(events))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventDto,
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the creator or a manager"),
        (status = 404, description = "Event not found"),
        (status = 422, description = "End before start or missing subject")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_event(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<EventId>,
    ValidatedJson(dto): ValidatedJson<UpdateEventDto>,
) -> Result<Json<Event>, AppError> {
    let event = EventService::update_event(&state.db, auth_user.caller()?, id, dto).await?;
    Ok(Json(event))
}

#[utoipa::path(
    patch,
    path = "/api/events/{id}/cancel",
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event cancelled", body = Event),
        (status = 400, description = "Event already cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only the creator or a manager"),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn cancel_event(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<EventId>,
) -> Result<Json<Event>, AppError> {
    let event = EventService::cancel_event(&state.db, auth_user.caller()?, id).await?;
    Ok(Json(event))
}

#[utoipa::path(
    get,
    path = "/api/events/period/{period}",
    params(
        ("period" = PeriodKind, Path, description = "day, week, month or upcoming"),
        PeriodFilterParams
    ),
    responses(
        (status = 200, description = "Events of the window grouped by date", body = PeriodEventsResponse),
        (status = 400, description = "Unknown period"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_events_by_period(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(period): Path<PeriodKind>,
    Query(filters): Query<PeriodFilterParams>,
) -> Result<Json<PeriodEventsResponse>, AppError> {
    let response =
        EventService::events_by_period(&state.db, auth_user.caller()?, period, filters, Utc::now())
            .await?;
    Ok(Json(response))
}
