use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::{AttendanceSessionId, ClassId, UserId};
use tracing::instrument;

use crate::middleware::auth::{AuthUser, RequireStaff, RequireTeacher};
use crate::modules::attendance::model::{
    AttendanceEntry, AttendanceSessionWithEntries, ClassAttendanceQuery, CreateAttendanceDto,
    JustifyAbsenceDto, PeriodQuery, StudentAttendanceReport,
};
use crate::modules::attendance::service::AttendanceService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CreateAttendanceDto,
    responses(
        (status = 201, description = "Attendance recorded", body = AttendanceSessionWithEntries),
        (status = 400, description = "Student not enrolled in the class"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Class belongs to another teacher"),
        (status = 404, description = "Class not found"),
        (status = 409, description = "Attendance already recorded for that date")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn record_attendance(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    ValidatedJson(dto): ValidatedJson<CreateAttendanceDto>,
) -> Result<(StatusCode, Json<AttendanceSessionWithEntries>), AppError> {
    let session = AttendanceService::create_session(&state.db, auth_user.caller()?, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/attendance/class/{class_id}",
    params(
        ("class_id" = Uuid, Path, description = "Class ID"),
        ClassAttendanceQuery
    ),
    responses(
        (status = 200, description = "Sessions of the class, newest first", body = Vec<AttendanceSessionWithEntries>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Class belongs to another teacher"),
        (status = 404, description = "Class not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_class_attendance(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(class_id): Path<ClassId>,
    Query(query): Query<ClassAttendanceQuery>,
) -> Result<Json<Vec<AttendanceSessionWithEntries>>, AppError> {
    let sessions =
        AttendanceService::list_for_class(&state.db, auth_user.caller()?, class_id, query.date)
            .await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    patch,
    path = "/api/attendance/{id}/justify",
    params(("id" = Uuid, Path, description = "Attendance session ID")),
    request_body = JustifyAbsenceDto,
    responses(
        (status = 200, description = "Absence justified", body = AttendanceEntry),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Class belongs to another teacher"),
        (status = 404, description = "Session or entry not found"),
        (status = 422, description = "Empty justification")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn justify_absence(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<AttendanceSessionId>,
    ValidatedJson(dto): ValidatedJson<JustifyAbsenceDto>,
) -> Result<Json<AttendanceEntry>, AppError> {
    let entry = AttendanceService::justify_absence(&state.db, auth_user.caller()?, id, dto).await?;
    Ok(Json(entry))
}

#[utoipa::path(
    get,
    path = "/api/attendance/student/{student_id}",
    params(
        ("student_id" = Uuid, Path, description = "Student ID"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Attendance history and statistics", body = StudentAttendanceReport),
        (status = 400, description = "Malformed period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller may not see this student"),
        (status = 404, description = "Student not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_student_attendance(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(student_id): Path<UserId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<StudentAttendanceReport>, AppError> {
    let period = query
        .range()
        .map_err(|e| AppError::bad_request(anyhow!(e)))?;

    let report = AttendanceService::student_report(
        &state.db,
        auth_user.caller()?,
        student_id,
        period,
        PeriodQuery::label(period),
    )
    .await?;
    Ok(Json(report))
}
