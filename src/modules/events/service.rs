use anyhow::anyhow;
use chrono::{DateTime, Utc};
use escola_core::{AppError, UserRole};
use escola_models::{ClassId, EventId, UserId};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::events::model::{
    CreateEventDto, Event, EventFilterParams, EventStatus, PeriodEventsResponse,
    PeriodFilterParams, PeriodKind, UpdateEventDto,
};
use crate::modules::events::timeline;

pub(crate) const EVENT_SELECT: &str = r#"
    SELECT e.id, e.title, e.description, e.kind, e.starts_at, e.ends_at, e.class_ids,
           e.created_by, u.name AS creator_name, e.subject, e.location, e.status,
           e.created_at, e.updated_at
    FROM events e
    JOIN users u ON u.id = e.created_by
"#;

/// Restricts students to events linked to one of their classes.
const STUDENT_SCOPE: &str = "($1::uuid IS NULL OR e.class_ids && ARRAY(SELECT class_id FROM class_students WHERE student_id = $1))";

fn student_scope(caller: Caller) -> Option<UserId> {
    (caller.role == UserRole::Student).then_some(caller.id)
}

pub struct EventService;

impl EventService {
    async fn find_by_id(db: &PgPool, id: EventId) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(&format!("{} WHERE e.id = $1", EVENT_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Event not found")))
    }

    fn authorize_owner(caller: Caller, event: &Event) -> Result<(), AppError> {
        if caller.role != UserRole::Manager && event.created_by != caller.id {
            return Err(AppError::forbidden(
                "Only the creator or a manager may change this event",
            ));
        }
        Ok(())
    }

    async fn ensure_classes_exist(db: &PgPool, class_ids: &[ClassId]) -> Result<(), AppError> {
        if class_ids.is_empty() {
            return Ok(());
        }

        let found: HashSet<ClassId> =
            sqlx::query_scalar::<_, ClassId>("SELECT id FROM classes WHERE id = ANY($1)")
                .bind(class_ids)
                .fetch_all(db)
                .await?
                .into_iter()
                .collect();

        let missing: Vec<String> = class_ids
            .iter()
            .filter(|id| !found.contains(id))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::bad_request(anyhow!(
                "Classes not found: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    #[instrument(skip(db, dto), fields(kind = ?dto.kind))]
    pub async fn create_event(
        db: &PgPool,
        creator_id: UserId,
        dto: CreateEventDto,
    ) -> Result<Event, AppError> {
        Self::ensure_classes_exist(db, &dto.class_ids).await?;

        let id = sqlx::query_scalar::<_, EventId>(
            r#"INSERT INTO events (title, description, kind, starts_at, ends_at, class_ids, created_by, subject, location)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(dto.title.trim())
        .bind(&dto.description)
        .bind(dto.kind)
        .bind(dto.starts_at)
        .bind(dto.ends_at)
        .bind(&dto.class_ids)
        .bind(creator_id)
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(&dto.location)
        .fetch_one(db)
        .await?;

        Self::find_by_id(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn list_events(
        db: &PgPool,
        caller: Caller,
        filters: EventFilterParams,
    ) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} WHERE {}
                 AND ($2::timestamptz IS NULL OR e.starts_at >= $2)
                 AND ($3::timestamptz IS NULL OR e.starts_at <= $3)
                 AND ($4::event_kind IS NULL OR e.kind = $4)
                 AND ($5::uuid IS NULL OR $5 = ANY(e.class_ids))
                 AND ($6::text IS NULL OR e.subject = $6)
               ORDER BY e.starts_at"#,
            EVENT_SELECT, STUDENT_SCOPE
        ))
        .bind(student_scope(caller))
        .bind(filters.start)
        .bind(filters.end)
        .bind(filters.kind)
        .bind(filters.class_id)
        .bind(filters.subject)
        .fetch_all(db)
        .await?;

        Ok(events)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_event(
        db: &PgPool,
        caller: Caller,
        id: EventId,
        dto: UpdateEventDto,
    ) -> Result<Event, AppError> {
        let event = Self::find_by_id(db, id).await?;
        Self::authorize_owner(caller, &event)?;

        let status = dto.status.unwrap_or(event.status);
        let merged = dto
            .merge_into(&event)
            .map_err(|errors| AppError::validation(&errors))?;
        Self::ensure_classes_exist(db, &merged.class_ids).await?;

        sqlx::query(
            r#"UPDATE events
               SET title = $2, description = $3, kind = $4, starts_at = $5, ends_at = $6,
                   class_ids = $7, subject = $8, location = $9, status = $10, updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(merged.title.trim())
        .bind(&merged.description)
        .bind(merged.kind)
        .bind(merged.starts_at)
        .bind(merged.ends_at)
        .bind(&merged.class_ids)
        .bind(merged.subject.as_deref().map(str::trim))
        .bind(&merged.location)
        .bind(status)
        .execute(db)
        .await?;

        Self::find_by_id(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn cancel_event(db: &PgPool, caller: Caller, id: EventId) -> Result<Event, AppError> {
        let event = Self::find_by_id(db, id).await?;
        Self::authorize_owner(caller, &event)?;

        if event.status == EventStatus::Cancelled {
            return Err(AppError::bad_request(anyhow!("Event is already cancelled")));
        }

        sqlx::query("UPDATE events SET status = 'cancelled', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        Self::find_by_id(db, id).await
    }

    /// Events starting inside the window, annotated relative to `now`.
    #[instrument(skip(db))]
    pub async fn events_by_period(
        db: &PgPool,
        caller: Caller,
        period: PeriodKind,
        filters: PeriodFilterParams,
        now: DateTime<Utc>,
    ) -> Result<PeriodEventsResponse, AppError> {
        let window = timeline::window(period, now);

        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} WHERE {}
                 AND e.starts_at >= $2 AND e.starts_at <= $3
                 AND ($4::event_kind IS NULL OR e.kind = $4)
                 AND ($5::text IS NULL OR e.subject = $5)
               ORDER BY e.starts_at"#,
            EVENT_SELECT, STUDENT_SCOPE
        ))
        .bind(student_scope(caller))
        .bind(window.start)
        .bind(window.end)
        .bind(filters.kind)
        .bind(filters.subject)
        .fetch_all(db)
        .await?;

        let breakdown = timeline::breakdown(events, filters.status, now);

        Ok(PeriodEventsResponse {
            period: window,
            stats: breakdown.stats,
            urgency_summary: breakdown.urgency_summary,
            data: breakdown.data,
        })
    }

    /// Next scheduled events visible to the caller, soonest first.
    pub async fn upcoming(
        db: &PgPool,
        caller: Caller,
        created_by: Option<UserId>,
        limit: i64,
    ) -> Result<Vec<Event>, AppError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            r#"{} WHERE {}
                 AND e.status = 'scheduled' AND e.starts_at >= NOW()
                 AND ($2::uuid IS NULL OR e.created_by = $2)
               ORDER BY e.starts_at
               LIMIT $3"#,
            EVENT_SELECT, STUDENT_SCOPE
        ))
        .bind(student_scope(caller))
        .bind(created_by)
        .bind(limit)
        .fetch_all(db)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_students_are_scoped_to_their_classes() {
        let id = UserId::new();
        for role in [UserRole::Guardian, UserRole::Teacher, UserRole::Manager] {
            assert_eq!(student_scope(Caller { id, role }), None);
        }
        assert_eq!(
            student_scope(Caller {
                id,
                role: UserRole::Student
            }),
            Some(id)
        );
    }
}
