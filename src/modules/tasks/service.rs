use anyhow::anyhow;
use escola_core::{AppError, UserRole};
use escola_models::{TaskId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::tasks::model::{CreateTaskDto, Task, UpdateTaskDto};

const TASK_SELECT: &str = r#"
    SELECT t.id, t.title, t.description, t.due_date, t.student_id, s.name AS student_name,
           t.teacher_id, p.name AS teacher_name, t.created_at, t.updated_at
    FROM tasks t
    JOIN users s ON s.id = t.student_id
    JOIN users p ON p.id = t.teacher_id
"#;

pub struct TaskService;

impl TaskService {
    async fn find_owned(db: &PgPool, teacher_id: UserId, id: TaskId) -> Result<Task, AppError> {
        sqlx::query_as::<_, Task>(&format!(
            "{} WHERE t.id = $1 AND t.teacher_id = $2 AND t.is_active",
            TASK_SELECT
        ))
        .bind(id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Task not found")))
    }

    #[instrument(skip(db, dto), fields(student_id = %dto.student_id))]
    pub async fn create_task(
        db: &PgPool,
        teacher_id: UserId,
        dto: CreateTaskDto,
    ) -> Result<Task, AppError> {
        let role = sqlx::query_scalar::<_, UserRole>(
            "SELECT role FROM users WHERE id = $1 AND is_active",
        )
        .bind(dto.student_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;

        if role != UserRole::Student {
            return Err(AppError::bad_request(anyhow!(
                "Tasks can only be assigned to students"
            )));
        }

        let id = sqlx::query_scalar::<_, TaskId>(
            r#"INSERT INTO tasks (title, description, due_date, student_id, teacher_id)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.due_date)
        .bind(dto.student_id)
        .bind(teacher_id)
        .fetch_one(db)
        .await?;

        Self::find_owned(db, teacher_id, id).await
    }

    #[instrument(skip(db))]
    pub async fn list_for_student(db: &PgPool, student_id: UserId) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "{} WHERE t.student_id = $1 AND t.is_active ORDER BY t.due_date, t.created_at",
            TASK_SELECT
        ))
        .bind(student_id)
        .fetch_all(db)
        .await?;

        Ok(tasks)
    }

    #[instrument(skip(db))]
    pub async fn list_for_teacher(db: &PgPool, teacher_id: UserId) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            "{} WHERE t.teacher_id = $1 AND t.is_active ORDER BY t.due_date, t.created_at",
            TASK_SELECT
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await?;

        Ok(tasks)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_task(
        db: &PgPool,
        teacher_id: UserId,
        id: TaskId,
        dto: UpdateTaskDto,
    ) -> Result<Task, AppError> {
        let result = sqlx::query(
            r#"UPDATE tasks
               SET title = COALESCE($3, title),
                   description = COALESCE($4, description),
                   due_date = COALESCE($5, due_date),
                   updated_at = NOW()
               WHERE id = $1 AND teacher_id = $2 AND is_active"#,
        )
        .bind(id)
        .bind(teacher_id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.due_date)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Task not found")));
        }

        Self::find_owned(db, teacher_id, id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_task(db: &PgPool, teacher_id: UserId, id: TaskId) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"UPDATE tasks SET is_active = false, updated_at = NOW()
               WHERE id = $1 AND teacher_id = $2 AND is_active"#,
        )
        .bind(id)
        .bind(teacher_id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Task not found")));
        }
        Ok(())
    }
}
