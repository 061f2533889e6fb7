use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use escola_core::AppError;
use escola_models::TaskId;
use escola_models::auth::MessageResponse;
use tracing::instrument;

use crate::middleware::auth::{RequireStudent, RequireTeacher};
use crate::modules::tasks::model::{CreateTaskDto, Task, UpdateTaskDto};
use crate::modules::tasks::service::TaskService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskDto,
    responses(
        (status = 201, description = "Task assigned", body = Task),
        (status = 400, description = "Target is not a student"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Student not found"),
        (status = 422, description = "Validation error")
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_task(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    ValidatedJson(dto): ValidatedJson<CreateTaskDto>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let task = TaskService::create_task(&state.db, auth_user.user_id()?, dto).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/mine",
    responses(
        (status = 200, description = "Active tasks assigned to the student", body = Vec<Task>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Students only")
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_my_tasks(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = TaskService::list_for_student(&state.db, auth_user.user_id()?).await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    get,
    path = "/api/tasks/teacher",
    responses(
        (status = 200, description = "Active tasks created by the teacher", body = Vec<Task>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only")
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_teacher_tasks(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = TaskService::list_for_teacher(&state.db, auth_user.user_id()?).await?;
    Ok(Json(tasks))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    request_body = UpdateTaskDto,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Task not found")
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_task(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<TaskId>,
    ValidatedJson(dto): ValidatedJson<UpdateTaskDto>,
) -> Result<Json<Task>, AppError> {
    let task = TaskService::update_task(&state.db, auth_user.user_id()?, id, dto).await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(("id" = Uuid, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task removed", body = MessageResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Teachers only"),
        (status = 404, description = "Task not found")
    ),
    tag = "Tasks",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_task(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<TaskId>,
) -> Result<Json<MessageResponse>, AppError> {
    TaskService::delete_task(&state.db, auth_user.user_id()?, id).await?;
    Ok(Json(MessageResponse {
        message: "Task removed".to_string(),
    }))
}
