use anyhow::anyhow;
use escola_core::{AppError, UserRole};
use escola_models::{AnnouncementId, ClassId, UserId};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::announcements::model::{
    Announcement, AnnouncementFilterParams, AnnouncementKind, CreateAnnouncementDto,
    UpdateAnnouncementDto,
};

/// `$1` is always the caller, used for the read flag.
const ANNOUNCEMENT_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.kind, a.recipient_ids, a.class_id, a.author_id,
           u.name AS author_name, a.priority, a.expires_at,
           EXISTS(SELECT 1 FROM announcement_reads r
                  WHERE r.announcement_id = a.id AND r.user_id = $1) AS read,
           a.created_at, a.updated_at
    FROM announcements a
    JOIN users u ON u.id = a.author_id
"#;

/// Announcements a non-manager may see: school-wide, addressed to them, written
/// by them, or posted to a class they attend, teach or have a dependent in.
const AUDIENCE_SCOPE: &str = r#"(
    $2::boolean
    OR a.kind = 'general'
    OR a.author_id = $1
    OR $1 = ANY(a.recipient_ids)
    OR a.class_id IN (SELECT class_id FROM class_students WHERE student_id = $1)
    OR a.class_id IN (SELECT id FROM classes WHERE teacher_id = $1)
    OR a.class_id IN (
        SELECT cs.class_id FROM class_students cs
        JOIN users s ON s.id = cs.student_id
        WHERE s.guardian_id = $1
    )
)"#;

#[derive(Debug, FromRow)]
struct RecipientRole {
    id: UserId,
    role: UserRole,
}

/// Role a recipient must have for the announcement kind, if any.
pub fn required_recipient_role(kind: AnnouncementKind) -> Option<UserRole> {
    match kind {
        AnnouncementKind::Student => Some(UserRole::Student),
        AnnouncementKind::Teacher => Some(UserRole::Teacher),
        AnnouncementKind::General | AnnouncementKind::Class => None,
    }
}

/// Requested ids that are unknown or do not carry `role`.
pub fn invalid_recipients(
    requested: &[UserId],
    found: &HashMap<UserId, UserRole>,
    role: UserRole,
) -> Vec<UserId> {
    requested
        .iter()
        .filter(|id| found.get(id) != Some(&role))
        .copied()
        .collect()
}

pub struct AnnouncementService;

impl AnnouncementService {
    async fn fetch(
        db: &PgPool,
        reader: UserId,
        see_all: bool,
        id: AnnouncementId,
    ) -> Result<Announcement, AppError> {
        sqlx::query_as::<_, Announcement>(&format!(
            "{} WHERE a.id = $3 AND a.is_active AND {}",
            ANNOUNCEMENT_SELECT, AUDIENCE_SCOPE
        ))
        .bind(reader)
        .bind(see_all)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Announcement not found")))
    }

    async fn find_visible(
        db: &PgPool,
        caller: Caller,
        id: AnnouncementId,
    ) -> Result<Announcement, AppError> {
        Self::fetch(db, caller.id, caller.role == UserRole::Manager, id).await
    }

    async fn validate_audience(db: &PgPool, dto: &CreateAnnouncementDto) -> Result<(), AppError> {
        if dto.kind == AnnouncementKind::Class {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1 AND is_active)",
            )
            .bind(dto.class_id)
            .fetch_one(db)
            .await?;

            if !exists {
                return Err(AppError::not_found(anyhow!("Class not found")));
            }
        }

        if let Some(role) = required_recipient_role(dto.kind) {
            let found: HashMap<UserId, UserRole> = sqlx::query_as::<_, RecipientRole>(
                "SELECT id, role FROM users WHERE id = ANY($1) AND is_active",
            )
            .bind(&dto.recipient_ids)
            .fetch_all(db)
            .await?
            .into_iter()
            .map(|r| (r.id, r.role))
            .collect();

            let invalid = invalid_recipients(&dto.recipient_ids, &found, role);
            if !invalid.is_empty() {
                let ids: Vec<String> = invalid.iter().map(ToString::to_string).collect();
                return Err(AppError::bad_request(anyhow!(
                    "Recipients must be active users with role {}: {}",
                    role,
                    ids.join(", ")
                )));
            }
        }

        Ok(())
    }

    #[instrument(skip(db, dto), fields(kind = ?dto.kind))]
    pub async fn create_announcement(
        db: &PgPool,
        caller: Caller,
        dto: CreateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        Self::validate_audience(db, &dto).await?;

        let class_id: Option<ClassId> = match dto.kind {
            AnnouncementKind::Class => dto.class_id,
            _ => None,
        };
        let recipients = match required_recipient_role(dto.kind) {
            Some(_) => dto.recipient_ids.clone(),
            None => Vec::new(),
        };

        let id = sqlx::query_scalar::<_, AnnouncementId>(
            r#"INSERT INTO announcements (title, content, kind, recipient_ids, class_id, author_id, priority, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING id"#,
        )
        .bind(dto.title.trim())
        .bind(&dto.content)
        .bind(dto.kind)
        .bind(&recipients)
        .bind(class_id)
        .bind(caller.id)
        .bind(dto.priority)
        .bind(dto.expires_at)
        .fetch_one(db)
        .await?;

        Self::fetch(db, caller.id, true, id).await
    }

    /// Active, unexpired announcements visible to the caller, newest first.
    #[instrument(skip(db))]
    pub async fn list_announcements(
        db: &PgPool,
        caller: Caller,
        filters: AnnouncementFilterParams,
    ) -> Result<Vec<Announcement>, AppError> {
        let announcements = sqlx::query_as::<_, Announcement>(&format!(
            r#"{} WHERE a.is_active
                 AND (a.expires_at IS NULL OR a.expires_at > NOW())
                 AND {}
                 AND ($3::announcement_kind IS NULL OR a.kind = $3)
                 AND ($4::uuid IS NULL OR a.class_id = $4)
                 AND ($5::announcement_priority IS NULL OR a.priority = $5)
               ORDER BY a.created_at DESC"#,
            ANNOUNCEMENT_SELECT, AUDIENCE_SCOPE
        ))
        .bind(caller.id)
        .bind(caller.role == UserRole::Manager)
        .bind(filters.kind)
        .bind(filters.class_id)
        .bind(filters.priority)
        .fetch_all(db)
        .await?;

        Ok(announcements)
    }

    /// Records a read receipt; repeated calls keep the first one.
    #[instrument(skip(db))]
    pub async fn mark_read(
        db: &PgPool,
        caller: Caller,
        id: AnnouncementId,
    ) -> Result<(), AppError> {
        Self::find_visible(db, caller, id).await?;

        sqlx::query(
            r#"INSERT INTO announcement_reads (announcement_id, user_id)
               VALUES ($1, $2)
               ON CONFLICT (announcement_id, user_id) DO NOTHING"#,
        )
        .bind(id)
        .bind(caller.id)
        .execute(db)
        .await?;

        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn update_announcement(
        db: &PgPool,
        caller: Caller,
        id: AnnouncementId,
        dto: UpdateAnnouncementDto,
    ) -> Result<Announcement, AppError> {
        let result = sqlx::query(
            r#"UPDATE announcements
               SET title = COALESCE($2, title),
                   content = COALESCE($3, content),
                   priority = COALESCE($4, priority),
                   expires_at = COALESCE($5, expires_at),
                   updated_at = NOW()
               WHERE id = $1 AND is_active"#,
        )
        .bind(id)
        .bind(dto.title.as_deref().map(str::trim))
        .bind(&dto.content)
        .bind(dto.priority)
        .bind(dto.expires_at)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }

        Self::fetch(db, caller.id, true, id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_announcement(db: &PgPool, id: AnnouncementId) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE announcements SET is_active = false, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Announcement not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_role_by_kind() {
        assert_eq!(
            required_recipient_role(AnnouncementKind::Student),
            Some(UserRole::Student)
        );
        assert_eq!(
            required_recipient_role(AnnouncementKind::Teacher),
            Some(UserRole::Teacher)
        );
        assert_eq!(required_recipient_role(AnnouncementKind::General), None);
        assert_eq!(required_recipient_role(AnnouncementKind::Class), None);
    }

    #[test]
    fn test_invalid_recipients() {
        let student = UserId::new();
        let teacher = UserId::new();
        let unknown = UserId::new();
        let found: HashMap<UserId, UserRole> =
            [(student, UserRole::Student), (teacher, UserRole::Teacher)]
                .into_iter()
                .collect();

        assert!(invalid_recipients(&[student], &found, UserRole::Student).is_empty());
        assert_eq!(
            invalid_recipients(&[student, teacher, unknown], &found, UserRole::Student),
            vec![teacher, unknown]
        );
    }
}
