use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use escola_core::{AppError, PaginationParams, UserRole};
use escola_models::auth::MessageResponse;
use escola_models::{GradeId, UserId};
use tracing::instrument;

use crate::metrics::{track_grade_recorded, track_report_card_built};
use crate::middleware::auth::{AuthUser, RequireLearner, RequireManager, RequireStaff};
use crate::modules::grades::model::{
    CreateGradeDto, GradeFilterParams, GradeView, PaginatedGradesResponse, PeriodQuery,
    ReportCardResponse, SubjectAverage, UpdateGradeDto,
};
use crate::modules::grades::report_card::threshold_alerts;
use crate::modules::grades::service::GradeService;
use crate::modules::notifications::NotificationEvent;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/grades",
    request_body = CreateGradeDto,
    responses(
        (status = 201, description = "Grade recorded", body = GradeView),
        (status = 400, description = "Malformed body or target is not a student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only teachers and managers record grades"),
        (status = 404, description = "Student not found"),
        (status = 422, description = "Value or bimester out of range")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_grade(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    ValidatedJson(dto): ValidatedJson<CreateGradeDto>,
) -> Result<(StatusCode, Json<GradeView>), AppError> {
    let recorder_id = auth_user.user_id()?;
    let grade = GradeService::create_grade(&state.db, recorder_id, dto).await?;

    track_grade_recorded(&grade.subject);
    state.notifier.emit(NotificationEvent::GradePosted {
        student_id: grade.student_id,
        subject: grade.subject.clone(),
        value: grade.value,
        bimester: grade.bimester,
    });

    Ok((StatusCode::CREATED, Json(grade)))
}

#[utoipa::path(
    get,
    path = "/api/grades/mine",
    responses(
        (status = 200, description = "Own grades, or the dependents' grades for guardians", body = Vec<GradeView>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Only students and guardians")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_my_grades(
    State(state): State<AppState>,
    RequireLearner(auth_user): RequireLearner,
) -> Result<Json<Vec<GradeView>>, AppError> {
    let grades = GradeService::list_for_learner(&state.db, auth_user.caller()?).await?;
    Ok(Json(grades))
}

#[utoipa::path(
    get,
    path = "/api/grades",
    params(PaginationParams),
    responses(
        (status = 200, description = "All grades", body = PaginatedGradesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Managers only")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_grades(
    State(state): State<AppState>,
    RequireManager(_auth_user): RequireManager,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedGradesResponse>, AppError> {
    let grades = GradeService::list_all(&state.db, pagination).await?;
    Ok(Json(grades))
}

#[utoipa::path(
    get,
    path = "/api/grades/filter",
    params(GradeFilterParams),
    responses(
        (status = 200, description = "Grades visible to the caller, newest first", body = Vec<GradeView>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn filter_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(filters): Query<GradeFilterParams>,
) -> Result<Json<Vec<GradeView>>, AppError> {
    let grades = GradeService::filter_grades(&state.db, auth_user.caller()?, filters).await?;
    Ok(Json(grades))
}

#[utoipa::path(
    get,
    path = "/api/grades/report-card/{student_id}",
    params(
        ("student_id" = Uuid, Path, description = "Student ID"),
        PeriodQuery
    ),
    responses(
        (status = 200, description = "Per-subject report card", body = ReportCardResponse),
        (status = 400, description = "Malformed period"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller may not see this student"),
        (status = 404, description = "Student not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_report_card(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(student_id): Path<UserId>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<ReportCardResponse>, AppError> {
    let period = query
        .range()
        .map_err(|e| AppError::bad_request(anyhow!(e)))?;

    let student = GradeService::authorize_student(&state.db, auth_user.caller()?, student_id).await?;
    let report = GradeService::report_card(&state.db, student.id, period).await?;
    track_report_card_built(report.subjects().len());

    for event in threshold_alerts(&report, student.id, &state.notification_config) {
        state.notifier.emit(event);
    }

    Ok(Json(ReportCardResponse {
        student: student.to_ref(),
        report: report.into_subjects(),
        period: PeriodQuery::label(period),
    }))
}

#[utoipa::path(
    get,
    path = "/api/grades/average/{subject}",
    params(("subject" = String, Path, description = "Subject name")),
    responses(
        (status = 200, description = "Own average for students, overall average for staff", body = SubjectAverage),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Guardians use the report card instead")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_subject_average(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(subject): Path<String>,
) -> Result<Json<SubjectAverage>, AppError> {
    if auth_user.has_role(UserRole::Guardian) {
        return Err(AppError::forbidden(
            "Guardians may not read subject averages",
        ));
    }

    let average = GradeService::subject_average(&state.db, auth_user.caller()?, &subject).await?;
    Ok(Json(average))
}

#[utoipa::path(
    put,
    path = "/api/grades/{id}",
    params(("id" = Uuid, Path, description = "Grade ID")),
    request_body = UpdateGradeDto,
    responses(
        (status = 200, description = "Grade updated", body = GradeView),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers may only edit grades they recorded"),
        (status = 404, description = "Grade not found"),
        (status = 422, description = "Value or bimester out of range")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_grade(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<GradeId>,
    ValidatedJson(dto): ValidatedJson<UpdateGradeDto>,
) -> Result<Json<GradeView>, AppError> {
    let grade = GradeService::update_grade(&state.db, auth_user.caller()?, id, dto).await?;
    Ok(Json(grade))
}

#[utoipa::path(
    delete,
    path = "/api/grades/{id}",
    params(("id" = Uuid, Path, description = "Grade ID")),
    responses(
        (status = 200, description = "Grade deleted", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers may only delete grades they recorded"),
        (status = 404, description = "Grade not found")
    ),
    tag = "Grades",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_grade(
    State(state): State<AppState>,
    RequireStaff(auth_user): RequireStaff,
    Path(id): Path<GradeId>,
) -> Result<Json<MessageResponse>, AppError> {
    GradeService::delete_grade(&state.db, auth_user.caller()?, id).await?;
    Ok(Json(MessageResponse {
        message: "Grade deleted".to_string(),
    }))
}
