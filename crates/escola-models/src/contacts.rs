//! School contacts and their weekly office hours.

use chrono::{DateTime, Utc, Weekday};
use escola_core::serde::deserialize_optional_string;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{ContactId, UserId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
    sqlx::Type,
)]
#[sqlx(type_name = "contact_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Teacher,
    Administration,
    Coordination,
    Secretariat,
}

/// School weekday; office hours never fall on weekends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchoolDay {
    Segunda,
    Terca,
    Quarta,
    Quinta,
    Sexta,
}

impl SchoolDay {
    pub fn from_chrono(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(SchoolDay::Segunda),
            Weekday::Tue => Some(SchoolDay::Terca),
            Weekday::Wed => Some(SchoolDay::Quarta),
            Weekday::Thu => Some(SchoolDay::Quinta),
            Weekday::Fri => Some(SchoolDay::Sexta),
            Weekday::Sat | Weekday::Sun => None,
        }
    }
}

/// Wall-clock time of day stored as minutes since midnight.
///
/// Parses `"8:00"` and `"08:00"` alike and always prints two-digit hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        (hours < 24 && minutes < 60).then(|| Self(hours * 60 + minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl FromStr for ClockTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid time '{s}', expected HH:MM");
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hours = h.parse::<u16>().map_err(|_| invalid())?;
        let minutes = m.parse::<u16>().map_err(|_| invalid())?;
        Self::from_hm(hours, minutes).ok_or_else(invalid)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn validate_slot(slot: &OfficeHours) -> Result<(), ValidationError> {
    if slot.start_time >= slot.end_time {
        return Err(ValidationError::new("office_hours")
            .with_message("office hours must start before they end".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_slot"))]
pub struct OfficeHours {
    pub day: SchoolDay,
    #[schema(value_type = String, example = "08:00")]
    pub start_time: ClockTime,
    #[schema(value_type = String, example = "12:00")]
    pub end_time: ClockTime,
    pub location: Option<String>,
}

impl OfficeHours {
    /// Inclusive on both ends.
    pub fn contains(&self, time: ClockTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Contact {
    pub id: ContactId,
    pub user_id: UserId,
    pub user_name: String,
    pub user_email: String,
    pub kind: ContactKind,
    pub role_title: String,
    pub subjects: Vec<String>,
    #[schema(value_type = Vec<OfficeHours>)]
    pub office_hours: Json<Vec<OfficeHours>>,
    pub phone: Option<String>,
    pub professional_email: Option<String>,
    pub room: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateContactDto {
    pub user_id: UserId,
    pub kind: ContactKind,
    #[validate(length(min = 1, max = 100, message = "role_title must have between 1 and 100 characters"))]
    pub role_title: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub office_hours: Vec<OfficeHours>,
    #[validate(length(max = 20, message = "phone must have at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "professional_email is invalid"))]
    pub professional_email: Option<String>,
    #[validate(length(max = 50, message = "room must have at most 50 characters"))]
    pub room: Option<String>,
    #[validate(length(max = 100, message = "department must have at most 100 characters"))]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateContactDto {
    pub kind: Option<ContactKind>,
    #[validate(length(min = 1, max = 100, message = "role_title must have between 1 and 100 characters"))]
    pub role_title: Option<String>,
    pub subjects: Option<Vec<String>>,
    #[validate(nested)]
    pub office_hours: Option<Vec<OfficeHours>>,
    #[validate(length(max = 20, message = "phone must have at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "professional_email is invalid"))]
    pub professional_email: Option<String>,
    #[validate(length(max = 50, message = "room must have at most 50 characters"))]
    pub room: Option<String>,
    #[validate(length(max = 100, message = "department must have at most 100 characters"))]
    pub department: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactFilterParams {
    pub kind: Option<ContactKind>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub role_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactSearchParams {
    /// Matched against name, subjects, role title and department
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub term: Option<String>,
    pub day: Option<SchoolDay>,
    /// Slot must start at or before this time
    #[param(value_type = Option<String>, example = "08:00")]
    pub start_time: Option<ClockTime>,
    /// Slot must end at or after this time
    #[param(value_type = Option<String>, example = "12:00")]
    pub end_time: Option<ClockTime>,
}

impl ContactSearchParams {
    /// Whether `slot` satisfies the day and time-window filters.
    pub fn matches_slot(&self, slot: &OfficeHours) -> bool {
        self.day.is_none_or(|day| slot.day == day)
            && self.start_time.is_none_or(|t| slot.start_time <= t)
            && self.end_time.is_none_or(|t| slot.end_time >= t)
    }

    pub fn has_schedule_filter(&self) -> bool {
        self.day.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }

    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchFilters {
    pub day: Option<SchoolDay>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<ClockTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<ClockTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    OutsideHours,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimeRemaining {
    pub hours: u16,
    pub minutes: u16,
}

impl TimeRemaining {
    pub fn from_minutes(total: u16) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NextSlot {
    pub day: SchoolDay,
    pub slot: OfficeHours,
    pub days_until: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Availability {
    pub available: bool,
    pub status: AvailabilityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_slot: Option<OfficeHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<TimeRemaining>,
    /// Next upcoming slot; null when the schedule is empty
    pub next: Option<NextSlot>,
}

impl Availability {
    pub fn available_now(slot: OfficeHours, remaining: TimeRemaining) -> Self {
        Self {
            available: true,
            status: AvailabilityStatus::Available,
            current_slot: Some(slot),
            remaining: Some(remaining),
            next: None,
        }
    }

    pub fn not_available(status: AvailabilityStatus, next: Option<NextSlot>) -> Self {
        Self {
            available: false,
            status,
            current_slot: None,
            remaining: None,
            next,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactSearchResult {
    #[serde(flatten)]
    pub contact: Contact,
    pub relevance: u32,
    pub availability: Availability,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactSearchResponse {
    pub total: usize,
    /// The search term, or `"all"`
    pub term: String,
    pub filters: SearchFilters,
    #[schema(value_type = Object)]
    pub results: BTreeMap<ContactKind, Vec<ContactSearchResult>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactListResponse {
    pub total: usize,
    #[schema(value_type = Object)]
    pub grouped: BTreeMap<ContactKind, Vec<Contact>>,
    pub list: Vec<Contact>,
}
