//! School events (provas, trabalhos, reuniões...).

use chrono::{DateTime, Utc};
use escola_core::serde::{deserialize_optional_string, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ids::{ClassId, EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "event_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Exam,
    Assignment,
    Meeting,
    Holiday,
    Other,
}

impl EventKind {
    /// Exams and assignments belong to a subject.
    pub fn requires_subject(&self) -> bool {
        matches!(self, EventKind::Exam | EventKind::Assignment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Scheduled,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub class_ids: Vec<ClassId>,
    pub created_by: UserId,
    pub creator_name: String,
    pub subject: Option<String>,
    pub location: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_event_window(dto: &CreateEventDto) -> Result<(), ValidationError> {
    if dto.ends_at < dto.starts_at {
        return Err(ValidationError::new("event_window")
            .with_message("ends_at must not be before starts_at".into()));
    }
    if dto.kind.requires_subject() && dto.subject.as_deref().is_none_or(|s| s.trim().is_empty()) {
        return Err(ValidationError::new("event_subject")
            .with_message("subject is required for exams and assignments".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_event_window"))]
pub struct CreateEventDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub class_ids: Vec<ClassId>,
    #[validate(length(max = 100, message = "subject must have at most 100 characters"))]
    pub subject: Option<String>,
    #[validate(length(max = 200, message = "location must have at most 200 characters"))]
    pub location: Option<String>,
}

/// Partial update; missing fields keep their stored value.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateEventDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "description must not be empty"))]
    pub description: Option<String>,
    pub kind: Option<EventKind>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub class_ids: Option<Vec<ClassId>>,
    #[validate(length(max = 100, message = "subject must have at most 100 characters"))]
    pub subject: Option<String>,
    #[validate(length(max = 200, message = "location must have at most 200 characters"))]
    pub location: Option<String>,
    pub status: Option<EventStatus>,
}

impl UpdateEventDto {
    /// Applies the patch to a stored event, re-checking the cross-field rules.
    pub fn merge_into(self, event: &Event) -> Result<CreateEventDto, validator::ValidationErrors> {
        let merged = CreateEventDto {
            title: self.title.unwrap_or_else(|| event.title.clone()),
            description: self.description.unwrap_or_else(|| event.description.clone()),
            kind: self.kind.unwrap_or(event.kind),
            starts_at: self.starts_at.unwrap_or(event.starts_at),
            ends_at: self.ends_at.unwrap_or(event.ends_at),
            class_ids: self.class_ids.unwrap_or_else(|| event.class_ids.clone()),
            subject: self.subject.or_else(|| event.subject.clone()),
            location: self.location.or_else(|| event.location.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilterParams {
    /// Events starting at or after this instant
    pub start: Option<DateTime<Utc>>,
    /// Events starting at or before this instant
    pub end: Option<DateTime<Utc>>,
    pub kind: Option<EventKind>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub class_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub subject: Option<String>,
}

/// Window for `GET /events/period/{period}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Day,
    Week,
    Month,
    /// Next 30 days
    Upcoming,
}

/// Status of an event relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStatus {
    Scheduled,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Overdue,
    Urgent,
    Soon,
    Future,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodFilterParams {
    pub status: Option<TimelineStatus>,
    pub kind: Option<EventKind>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventWithTimeline {
    #[serde(flatten)]
    pub event: Event,
    pub urgency: Urgency,
    pub days_until: i64,
    pub timeline_status: TimelineStatus,
    pub in_progress: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UrgencyItem {
    pub id: EventId,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub kind: EventKind,
    pub days_until: i64,
    pub timeline_status: TimelineStatus,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct UrgencySummary {
    pub urgent: Vec<UrgencyItem>,
    pub soon: Vec<UrgencyItem>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PeriodStats {
    /// Events in the window before the status filter
    pub total: usize,
    /// Events left after the status filter
    pub filtered: usize,
    #[schema(value_type = Object)]
    pub by_status: BTreeMap<TimelineStatus, usize>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PeriodEventsResponse {
    pub period: PeriodWindow,
    pub stats: PeriodStats,
    pub urgency_summary: UrgencySummary,
    /// Events grouped by start date (YYYY-MM-DD)
    pub data: BTreeMap<String, Vec<EventWithTimeline>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create(kind: EventKind, subject: Option<&str>, hours: i64) -> CreateEventDto {
        let starts_at = Utc::now();
        CreateEventDto {
            title: "Prova bimestral".to_string(),
            description: "Capítulos 1 a 4".to_string(),
            kind,
            starts_at,
            ends_at: starts_at + Duration::hours(hours),
            class_ids: vec![],
            subject: subject.map(str::to_string),
            location: None,
        }
    }

    #[test]
    fn test_end_before_start_rejected() {
        assert!(create(EventKind::Meeting, None, -1).validate().is_err());
        assert!(create(EventKind::Meeting, None, 0).validate().is_ok());
    }

    #[test]
    fn test_exam_requires_subject() {
        assert!(create(EventKind::Exam, None, 2).validate().is_err());
        assert!(create(EventKind::Exam, Some("  "), 2).validate().is_err());
        assert!(create(EventKind::Exam, Some("História"), 2).validate().is_ok());
        assert!(create(EventKind::Holiday, None, 24).validate().is_ok());
    }

    #[test]
    fn test_timeline_status_serialization() {
        assert_eq!(
            serde_json::to_string(&TimelineStatus::InProgress).unwrap(),
            r#""in_progress""#
        );
    }

    #[test]
    fn test_period_kind_parsing() {
        let kind: PeriodKind = serde_json::from_str(r#""upcoming""#).unwrap();
        assert_eq!(kind, PeriodKind::Upcoming);
        assert!(serde_json::from_str::<PeriodKind>(r#""year""#).is_err());
    }
}
