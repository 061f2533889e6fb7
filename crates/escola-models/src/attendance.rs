//! Attendance sessions (frequência): one per class per date.

use chrono::{DateTime, NaiveDate, Utc};
use escola_core::serde::deserialize_optional_date;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::{AttendanceSessionId, ClassId, UserId};
use crate::report_card::AttendanceSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Justified,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSession {
    pub id: AttendanceSessionId,
    pub class_id: ClassId,
    pub date: NaiveDate,
    pub recorded_by: UserId,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceEntry {
    pub session_id: AttendanceSessionId,
    pub student_id: UserId,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttendanceSessionWithEntries {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttendanceEntryInput {
    pub student_id: UserId,
    pub status: AttendanceStatus,
    #[validate(length(max = 500, message = "justification must have at most 500 characters"))]
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAttendanceDto {
    pub class_id: ClassId,
    pub date: NaiveDate,
    #[validate(length(min = 1, message = "entries must not be empty"), nested)]
    pub entries: Vec<AttendanceEntryInput>,
    #[validate(length(max = 1000, message = "note must have at most 1000 characters"))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct JustifyAbsenceDto {
    pub student_id: UserId,
    #[validate(length(min = 1, max = 500, message = "justification must have between 1 and 500 characters"))]
    pub justification: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClassAttendanceQuery {
    /// Only the session of this day (YYYY-MM-DD)
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    #[param(value_type = Option<String>)]
    pub date: Option<NaiveDate>,
}

/// One line of a student's attendance history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentAttendanceLine {
    pub session_id: AttendanceSessionId,
    pub class_id: ClassId,
    pub class_name: String,
    pub subject: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub justification: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentAttendanceReport {
    pub student_id: UserId,
    pub period: String,
    pub sessions: Vec<StudentAttendanceLine>,
    pub stats: AttendanceSummary,
}
