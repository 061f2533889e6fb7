use anyhow::anyhow;
use escola_core::{AppError, UserRole};
use escola_models::{NotificationId, UserId};
use sqlx::{FromRow, PgPool, types::Json};
use tracing::instrument;

use super::dispatcher::RenderedNotification;
use crate::modules::notifications::model::{DeviceToken, Notification, RegisterDeviceTokenDto};

/// Newest notifications returned by `/mine`
const MINE_LIMIT: i64 = 50;

/// Student addressed by a notification event.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationTarget {
    pub id: UserId,
    pub name: String,
    pub guardian_id: Option<UserId>,
}

pub struct NotificationService;

impl NotificationService {
    #[instrument(skip(db))]
    pub async fn list_mine(db: &PgPool, user_id: UserId) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"SELECT id, recipient_id, kind, title, message, is_read, data, created_at
               FROM notifications
               WHERE recipient_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(MINE_LIMIT)
        .fetch_all(db)
        .await?;

        Ok(notifications)
    }

    #[instrument(skip(db))]
    pub async fn mark_read(
        db: &PgPool,
        notification_id: NotificationId,
        user_id: UserId,
    ) -> Result<Notification, AppError> {
        sqlx::query_as::<_, Notification>(
            r#"UPDATE notifications SET is_read = TRUE
               WHERE id = $1 AND recipient_id = $2
               RETURNING id, recipient_id, kind, title, message, is_read, data, created_at"#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Notification not found")))
    }

    /// Re-registering an identical token refreshes its device label and timestamp.
    #[instrument(skip(db, dto), fields(device = %dto.device))]
    pub async fn register_device_token(
        db: &PgPool,
        user_id: UserId,
        dto: RegisterDeviceTokenDto,
    ) -> Result<DeviceToken, AppError> {
        let token = sqlx::query_as::<_, DeviceToken>(
            r#"INSERT INTO device_tokens (user_id, token, device)
               VALUES ($1, $2, $3)
               ON CONFLICT (user_id, token)
               DO UPDATE SET device = EXCLUDED.device, last_seen_at = NOW()
               RETURNING id, user_id, token, device, last_seen_at"#,
        )
        .bind(user_id)
        .bind(&dto.token)
        .bind(&dto.device)
        .fetch_one(db)
        .await?;

        Ok(token)
    }

    #[instrument(skip(db))]
    pub async fn remove_device_tokens(db: &PgPool, user_id: UserId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM device_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;

        Ok(result.rows_affected())
    }

    // Worker queries

    pub async fn find_student(
        db: &PgPool,
        student_id: UserId,
    ) -> Result<Option<NotificationTarget>, sqlx::Error> {
        sqlx::query_as::<_, NotificationTarget>(
            "SELECT id, name, guardian_id FROM users WHERE id = $1 AND role = $2",
        )
        .bind(student_id)
        .bind(UserRole::Student)
        .fetch_optional(db)
        .await
    }

    /// Teachers of the student's active classes in `subject`.
    pub async fn subject_teachers(
        db: &PgPool,
        student_id: UserId,
        subject: &str,
    ) -> Result<Vec<UserId>, sqlx::Error> {
        sqlx::query_scalar::<_, UserId>(
            r#"SELECT DISTINCT c.teacher_id
               FROM classes c
               JOIN class_students cs ON cs.class_id = c.id
               WHERE cs.student_id = $1 AND c.subject = $2 AND c.is_active"#,
        )
        .bind(student_id)
        .bind(subject)
        .fetch_all(db)
        .await
    }

    pub async fn store(
        db: &PgPool,
        recipient_id: UserId,
        rendered: &RenderedNotification,
    ) -> Result<NotificationId, sqlx::Error> {
        sqlx::query_scalar::<_, NotificationId>(
            r#"INSERT INTO notifications (recipient_id, kind, title, message, data)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(recipient_id)
        .bind(rendered.kind)
        .bind(&rendered.title)
        .bind(&rendered.message)
        .bind(Json(&rendered.data))
        .fetch_one(db)
        .await
    }

    pub async fn device_tokens(db: &PgPool, user_id: UserId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT token FROM device_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn remove_token(db: &PgPool, user_id: UserId, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM device_tokens WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(db)
            .await?;
        Ok(())
    }
}
