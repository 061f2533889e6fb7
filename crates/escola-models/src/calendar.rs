//! Academic calendar entries (bimesters, holidays, assessments).

use chrono::{DateTime, NaiveDate, Utc};
use escola_core::serde::{deserialize_optional_date, deserialize_optional_uuid};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ids::{CalendarEntryId, ClassId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "calendar_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    TermPeriod,
    Holiday,
    Event,
    Assessment,
    Assignment,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "recurrence_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Recurrence {
    #[serde(default)]
    pub kind: RecurrenceKind,
    #[validate(range(min = 1, message = "recurrence interval must be at least 1"))]
    #[serde(default = "default_interval")]
    pub interval: i32,
    pub until: Option<NaiveDate>,
}

fn default_interval() -> i32 {
    1
}

impl Default for Recurrence {
    fn default() -> Self {
        Self {
            kind: RecurrenceKind::None,
            interval: 1,
            until: None,
        }
    }
}

/// Row shape of `calendar_entries`.
#[derive(Debug, Clone, FromRow)]
pub struct CalendarEntryRow {
    pub id: CalendarEntryId,
    pub title: String,
    pub description: Option<String>,
    pub kind: CalendarKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub recurrence_kind: RecurrenceKind,
    pub recurrence_interval: i32,
    pub recurrence_until: Option<NaiveDate>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CalendarEntry {
    pub id: CalendarEntryId,
    pub title: String,
    pub description: Option<String>,
    pub kind: CalendarKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub class_id: Option<ClassId>,
    pub class_name: Option<String>,
    pub recurrence: Recurrence,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CalendarEntryRow> for CalendarEntry {
    fn from(row: CalendarEntryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            kind: row.kind,
            starts_on: row.starts_on,
            ends_on: row.ends_on,
            class_id: row.class_id,
            class_name: row.class_name,
            recurrence: Recurrence {
                kind: row.recurrence_kind,
                interval: row.recurrence_interval,
                until: row.recurrence_until,
            },
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn validate_calendar_dates(dto: &CreateCalendarEntryDto) -> Result<(), ValidationError> {
    if dto.ends_on < dto.starts_on {
        return Err(ValidationError::new("calendar_dates")
            .with_message("ends_on must not be before starts_on".into()));
    }
    if let Some(until) = dto.recurrence.until {
        if until < dto.starts_on {
            return Err(ValidationError::new("recurrence_until")
                .with_message("recurrence until must not be before starts_on".into()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_calendar_dates"))]
pub struct CreateCalendarEntryDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    pub kind: CalendarKind,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub class_id: Option<ClassId>,
    #[serde(default)]
    #[validate(nested)]
    pub recurrence: Recurrence,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCalendarEntryDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<CalendarKind>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub class_id: Option<ClassId>,
    #[validate(nested)]
    pub recurrence: Option<Recurrence>,
}

impl UpdateCalendarEntryDto {
    pub fn merge_into(
        self,
        entry: &CalendarEntry,
    ) -> Result<CreateCalendarEntryDto, validator::ValidationErrors> {
        let merged = CreateCalendarEntryDto {
            title: self.title.unwrap_or_else(|| entry.title.clone()),
            description: self.description.or_else(|| entry.description.clone()),
            kind: self.kind.unwrap_or(entry.kind),
            starts_on: self.starts_on.unwrap_or(entry.starts_on),
            ends_on: self.ends_on.unwrap_or(entry.ends_on),
            class_id: self.class_id.or(entry.class_id),
            recurrence: self.recurrence.unwrap_or_else(|| entry.recurrence.clone()),
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarFilterParams {
    /// Entries ending on or after this date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>)]
    pub start: Option<NaiveDate>,
    /// Entries starting on or before this date
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>)]
    pub end: Option<NaiveDate>,
    pub kind: Option<CalendarKind>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub class_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn dto(start: u32, end: u32) -> CreateCalendarEntryDto {
        CreateCalendarEntryDto {
            title: "1º bimestre".to_string(),
            description: None,
            kind: CalendarKind::TermPeriod,
            starts_on: date(start),
            ends_on: date(end),
            class_id: None,
            recurrence: Recurrence::default(),
        }
    }

    #[test]
    fn test_dates_must_be_ordered() {
        assert!(dto(1, 28).validate().is_ok());
        assert!(dto(5, 5).validate().is_ok());
        assert!(dto(10, 2).validate().is_err());
    }

    #[test]
    fn test_recurrence_interval_must_be_positive() {
        let mut d = dto(1, 2);
        d.recurrence = Recurrence {
            kind: RecurrenceKind::Weekly,
            interval: 0,
            until: None,
        };
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_recurrence_defaults() {
        let r: Recurrence = serde_json::from_str("{}").unwrap();
        assert_eq!(r, Recurrence::default());
    }

    #[test]
    fn test_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&CalendarKind::TermPeriod).unwrap(),
            r#""term_period""#
        );
    }
}
