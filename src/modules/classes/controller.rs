use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::ClassId;
use tracing::instrument;

use crate::middleware::auth::RequireTeacher;
use crate::modules::classes::model::{
    ClassStudentsDto, ClassWithStudents, CreateClassDto, UpdateClassDto,
};
use crate::modules::classes::service::ClassService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    get,
    path = "/api/teacher/classes",
    responses(
        (status = 200, description = "The caller's active classes with their students", body = Vec<ClassWithStudents>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_classes(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
) -> Result<Json<Vec<ClassWithStudents>>, AppError> {
    let classes = ClassService::list_for_teacher(&state.db, auth_user.user_id()?).await?;
    Ok(Json(classes))
}

#[utoipa::path(
    post,
    path = "/api/teacher/classes",
    request_body = CreateClassDto,
    responses(
        (status = 201, description = "Class created", body = ClassWithStudents),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 422, description = "Validation error")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_class(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    ValidatedJson(dto): ValidatedJson<CreateClassDto>,
) -> Result<(StatusCode, Json<ClassWithStudents>), AppError> {
    let class = ClassService::create_class(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

#[utoipa::path(
    put,
    path = "/api/teacher/classes/{id}",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = UpdateClassDto,
    responses(
        (status = 200, description = "Class updated", body = ClassWithStudents),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Class not found"),
        (status = 422, description = "Validation error")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_class(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<UpdateClassDto>,
) -> Result<Json<ClassWithStudents>, AppError> {
    let class = ClassService::update_class(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(class))
}

#[utoipa::path(
    post,
    path = "/api/teacher/classes/{id}/students",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = ClassStudentsDto,
    responses(
        (status = 200, description = "Students enrolled", body = ClassWithStudents),
        (status = 400, description = "Some ids are not active students"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn add_students(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<ClassStudentsDto>,
) -> Result<Json<ClassWithStudents>, AppError> {
    let class = ClassService::add_students(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(class))
}

#[utoipa::path(
    delete,
    path = "/api/teacher/classes/{id}/students",
    params(("id" = Uuid, Path, description = "Class ID")),
    request_body = ClassStudentsDto,
    responses(
        (status = 200, description = "Students removed", body = ClassWithStudents),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn remove_students(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<ClassId>,
    ValidatedJson(dto): ValidatedJson<ClassStudentsDto>,
) -> Result<Json<ClassWithStudents>, AppError> {
    let class = ClassService::remove_students(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(class))
}
