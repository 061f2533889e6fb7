use anyhow::anyhow;
use chrono::NaiveDate;
use escola_core::{AppError, UserRole};
use escola_models::{CalendarEntryId, ClassId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::calendar::model::{
    CalendarEntry, CalendarEntryRow, CalendarFilterParams, CreateCalendarEntryDto,
    UpdateCalendarEntryDto,
};

const CALENDAR_SELECT: &str = r#"
    SELECT ce.id, ce.title, ce.description, ce.kind, ce.starts_on, ce.ends_on, ce.class_id,
           c.name AS class_name, ce.recurrence_kind, ce.recurrence_interval, ce.recurrence_until,
           ce.created_by, ce.created_at, ce.updated_at
    FROM calendar_entries ce
    LEFT JOIN classes c ON c.id = ce.class_id
"#;

pub struct CalendarService;

impl CalendarService {
    async fn find_by_id(db: &PgPool, id: CalendarEntryId) -> Result<CalendarEntry, AppError> {
        sqlx::query_as::<_, CalendarEntryRow>(&format!(
            "{} WHERE ce.id = $1 AND ce.is_active",
            CALENDAR_SELECT
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .map(CalendarEntry::from)
        .ok_or_else(|| AppError::not_found(anyhow!("Calendar entry not found")))
    }

    async fn ensure_class_exists(db: &PgPool, class_id: Option<ClassId>) -> Result<(), AppError> {
        let Some(class_id) = class_id else {
            return Ok(());
        };

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM classes WHERE id = $1)",
        )
        .bind(class_id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow!("Class not found")));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(kind = ?dto.kind))]
    pub async fn create_entry(
        db: &PgPool,
        creator_id: UserId,
        dto: CreateCalendarEntryDto,
    ) -> Result<CalendarEntry, AppError> {
        Self::ensure_class_exists(db, dto.class_id).await?;

        let id = sqlx::query_scalar::<_, CalendarEntryId>(
            r#"INSERT INTO calendar_entries
                   (title, description, kind, starts_on, ends_on, class_id,
                    recurrence_kind, recurrence_interval, recurrence_until, created_by)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING id"#,
        )
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.kind)
        .bind(dto.starts_on)
        .bind(dto.ends_on)
        .bind(dto.class_id)
        .bind(dto.recurrence.kind)
        .bind(dto.recurrence.interval)
        .bind(dto.recurrence.until)
        .bind(creator_id)
        .fetch_one(db)
        .await?;

        Self::find_by_id(db, id).await
    }

    /// Active entries overlapping the requested range. Students only see
    /// school-wide entries and those of their classes.
    #[instrument(skip(db))]
    pub async fn list_entries(
        db: &PgPool,
        caller: Caller,
        filters: CalendarFilterParams,
    ) -> Result<Vec<CalendarEntry>, AppError> {
        let student = (caller.role == UserRole::Student).then_some(caller.id);

        let rows = sqlx::query_as::<_, CalendarEntryRow>(&format!(
            r#"{} WHERE ce.is_active
                 AND ($1::uuid IS NULL OR ce.class_id IS NULL
                      OR ce.class_id IN (SELECT class_id FROM class_students WHERE student_id = $1))
                 AND ($2::date IS NULL OR ce.ends_on >= $2)
                 AND ($3::date IS NULL OR ce.starts_on <= $3)
                 AND ($4::calendar_kind IS NULL OR ce.kind = $4)
                 AND ($5::uuid IS NULL OR ce.class_id = $5)
               ORDER BY ce.starts_on, ce.title"#,
            CALENDAR_SELECT
        ))
        .bind(student)
        .bind(filters.start)
        .bind(filters.end)
        .bind(filters.kind)
        .bind(filters.class_id)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(CalendarEntry::from).collect())
    }

    #[instrument(skip(db))]
    pub async fn list_for_class(
        db: &PgPool,
        class_id: ClassId,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CalendarEntry>, AppError> {
        let rows = sqlx::query_as::<_, CalendarEntryRow>(&format!(
            r#"{} WHERE ce.is_active AND ce.class_id = $1
                 AND ($2::date IS NULL OR ce.ends_on >= $2)
                 AND ($3::date IS NULL OR ce.starts_on <= $3)
               ORDER BY ce.starts_on, ce.title"#,
            CALENDAR_SELECT
        ))
        .bind(class_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(CalendarEntry::from).collect())
    }

    #[instrument(skip(db, dto))]
    pub async fn update_entry(
        db: &PgPool,
        id: CalendarEntryId,
        dto: UpdateCalendarEntryDto,
    ) -> Result<CalendarEntry, AppError> {
        let entry = Self::find_by_id(db, id).await?;
        let merged = dto
            .merge_into(&entry)
            .map_err(|errors| AppError::validation(&errors))?;
        Self::ensure_class_exists(db, merged.class_id).await?;

        sqlx::query(
            r#"UPDATE calendar_entries
               SET title = $2, description = $3, kind = $4, starts_on = $5, ends_on = $6,
                   class_id = $7, recurrence_kind = $8, recurrence_interval = $9,
                   recurrence_until = $10, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(merged.title.trim())
        .bind(&merged.description)
        .bind(merged.kind)
        .bind(merged.starts_on)
        .bind(merged.ends_on)
        .bind(merged.class_id)
        .bind(merged.recurrence.kind)
        .bind(merged.recurrence.interval)
        .bind(merged.recurrence.until)
        .execute(db)
        .await?;

        Self::find_by_id(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_entry(db: &PgPool, id: CalendarEntryId) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE calendar_entries SET is_active = false, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Calendar entry not found")));
        }
        Ok(())
    }
}
