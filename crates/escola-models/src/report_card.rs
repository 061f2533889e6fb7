//! Report card (boletim) inputs and outputs.
//!
//! The aggregation itself lives in the server crate; this module only holds
//! the records it consumes and the per-subject report it produces.

use chrono::{DateTime, NaiveDate, Utc};
use escola_core::serde::deserialize_optional_string;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use crate::attendance::AttendanceStatus;
use crate::ids::{AttendanceSessionId, GradeId, UserId};

/// Grade as loaded for aggregation.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GradeRecord {
    pub id: GradeId,
    pub subject: String,
    pub value: f64,
    pub bimester: i16,
    pub teacher_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Flat row of a student's mark inside an attendance session.
#[derive(Debug, Clone, FromRow)]
pub struct AttendanceMarkRow {
    pub session_id: AttendanceSessionId,
    pub subject: String,
    pub date: NaiveDate,
    pub student_id: UserId,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceMark {
    pub student_id: UserId,
    pub status: AttendanceStatus,
}

/// Attendance session with the subject of its class.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub session_id: AttendanceSessionId,
    pub subject: String,
    pub date: NaiveDate,
    pub marks: Vec<AttendanceMark>,
}

impl AttendanceRecord {
    /// Groups flat rows by session, keeping the first-seen session order.
    pub fn group_rows(rows: Vec<AttendanceMarkRow>) -> Vec<AttendanceRecord> {
        let mut records: Vec<AttendanceRecord> = Vec::new();
        for row in rows {
            let mark = AttendanceMark {
                student_id: row.student_id,
                status: row.status,
            };
            match records.iter_mut().find(|r| r.session_id == row.session_id) {
                Some(record) => record.marks.push(mark),
                None => records.push(AttendanceRecord {
                    session_id: row.session_id,
                    subject: row.subject,
                    date: row.date,
                    marks: vec![mark],
                }),
            }
        }
        records
    }

    pub fn status_of(&self, student_id: UserId) -> Option<AttendanceStatus> {
        self.marks
            .iter()
            .find(|m| m.student_id == student_id)
            .map(|m| m.status)
    }
}

/// Non-negative figure rounded half-up to one decimal; serializes as `"7.5"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct OneDecimal(f64);

impl OneDecimal {
    pub const ZERO: OneDecimal = OneDecimal(0.0);

    pub fn round(value: f64) -> Self {
        // The 1e-9 nudge makes 6.65 (stored as 6.6499999...) round to 6.7. It also
        // rounds inputs within 1e-10 below a half step upward: 6.64999999995 gives 6.7.
        // Grades carry at most two decimals, so no real input sits that close.
        Self(((value * 10.0) + 0.5 + 1e-9).floor() / 10.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for OneDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

impl Serialize for OneDecimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn serialize_optional_one_decimal<S: Serializer>(
    value: &Option<OneDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

/// Percentage is `"0"` (not `"0.0"`) when no class was held.
fn serialize_percentage<S: Serializer>(
    value: &Option<OneDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_str("0"),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GradeLine {
    pub id: GradeId,
    pub value: f64,
    pub bimester: i16,
    pub recorded_at: DateTime<Utc>,
    pub teacher_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct BimesterSummary {
    pub sum: f64,
    pub count: u32,
    /// Null when the bimester has no grade
    #[serde(serialize_with = "serialize_optional_one_decimal")]
    #[schema(value_type = Option<String>, example = "7.0")]
    pub average: Option<OneDecimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub total_classes: u32,
    pub present: u32,
    pub absent: u32,
    pub justified: u32,
    /// `(present + justified) / total_classes * 100`
    #[serde(serialize_with = "serialize_percentage")]
    #[schema(value_type = String, example = "80.0")]
    pub percentage: Option<OneDecimal>,
}

impl AttendanceSummary {
    pub fn record(&mut self, status: AttendanceStatus) {
        self.total_classes += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Justified => self.justified += 1,
        }
    }

    /// Recomputes `percentage` from the counters.
    pub fn finalize(&mut self) {
        self.percentage = if self.total_classes == 0 {
            None
        } else {
            let attended = f64::from(self.present + self.justified);
            Some(OneDecimal::round(
                attended / f64::from(self.total_classes) * 100.0,
            ))
        };
    }

    /// Numeric percentage; `0.0` when no class was held.
    pub fn percentage_value(&self) -> f64 {
        self.percentage.map(OneDecimal::value).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SubjectReport {
    pub subject: String,
    pub grades: Vec<GradeLine>,
    /// Keyed by bimester 1 to 4
    pub bimesters: BTreeMap<u8, BimesterSummary>,
    /// Mean of the non-empty bimester averages
    #[schema(value_type = String, example = "6.0")]
    pub final_average: OneDecimal,
    pub attendance: AttendanceSummary,
}

/// Ordered subject reports; serializes as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ReportCard {
    subjects: Vec<SubjectReport>,
}

impl ReportCard {
    pub fn new(subjects: Vec<SubjectReport>) -> Self {
        Self { subjects }
    }

    pub fn subjects(&self) -> &[SubjectReport] {
        &self.subjects
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectReport> {
        self.subjects.iter().find(|s| s.subject == name)
    }

    pub fn into_subjects(self) -> Vec<SubjectReport> {
        self.subjects
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct StudentRef {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReportCardResponse {
    pub student: StudentRef,
    pub report: Vec<SubjectReport>,
    /// Echo of the `period` filter, or `"full academic year"`
    pub period: String,
}

pub const FULL_ACADEMIC_YEAR: &str = "full academic year";

/// Inclusive date range given as `YYYY-MM-DD,YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(',')
            .ok_or_else(|| "period must be formatted as start,end".to_string())?;

        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| format!("invalid date in period: {}", raw.trim()))
        };
        let (start, end) = (parse(start)?, parse(end)?);

        if end < start {
            return Err("period end must not be before its start".to_string());
        }
        Ok(Self { start, end })
    }
}

/// `?period=` filter shared by the report card and attendance reports.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// Inclusive range `YYYY-MM-DD,YYYY-MM-DD`; omitted means the full academic year
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub period: Option<String>,
}

impl PeriodQuery {
    pub fn range(&self) -> Result<Option<DateRange>, String> {
        self.period.as_deref().map(str::parse::<DateRange>).transpose()
    }

    /// Text echoed back in responses.
    pub fn label(range: Option<DateRange>) -> String {
        range
            .map(|r| r.to_string())
            .unwrap_or_else(|| FULL_ACADEMIC_YEAR.to_string())
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_decimal_rounds_half_up() {
        assert_eq!(OneDecimal::round(6.65).to_string(), "6.7");
        assert_eq!(OneDecimal::round(6.64).to_string(), "6.6");
        assert_eq!(OneDecimal::round(7.25).to_string(), "7.3");
        assert_eq!(OneDecimal::round(23.0 / 3.0).to_string(), "7.7");
        assert_eq!(OneDecimal::round(0.0).to_string(), "0.0");
    }

    #[test]
    fn test_one_decimal_tolerance_window() {
        assert_eq!(OneDecimal::round(6.649).to_string(), "6.6");
        assert_eq!(OneDecimal::round(6.6499999).to_string(), "6.6");
        assert_eq!(OneDecimal::round(6.64999999995).to_string(), "6.7");
        assert_eq!(OneDecimal::round(0.05).to_string(), "0.1");
    }

    #[test]
    fn test_percentage_serialization() {
        let empty = AttendanceSummary::default();
        let json = serde_json::to_value(&empty).unwrap();
        assert_eq!(json["percentage"], "0");

        let mut summary = AttendanceSummary::default();
        for _ in 0..6 {
            summary.record(AttendanceStatus::Present);
        }
        for _ in 0..2 {
            summary.record(AttendanceStatus::Justified);
        }
        for _ in 0..2 {
            summary.record(AttendanceStatus::Absent);
        }
        summary.finalize();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["total_classes"], 10);
        assert_eq!(json["percentage"], "80.0");
        assert_eq!(summary.percentage_value(), 80.0);
    }

    #[test]
    fn test_empty_bimester_average_is_null() {
        let json = serde_json::to_value(BimesterSummary::default()).unwrap();
        assert!(json["average"].is_null());
        assert_eq!(json["count"], 0);
    }

    #[test]
    fn test_date_range_parsing() {
        let range: DateRange = "2024-02-01,2024-06-30".parse().unwrap();
        assert_eq!(range.start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(range.to_string(), "2024-02-01,2024-06-30");

        assert!("2024-02-01".parse::<DateRange>().is_err());
        assert!("2024-06-30,2024-02-01".parse::<DateRange>().is_err());
        assert!("ontem,hoje".parse::<DateRange>().is_err());
    }

    #[test]
    fn test_period_query() {
        let none = PeriodQuery::default();
        assert_eq!(none.range(), Ok(None));
        assert_eq!(PeriodQuery::label(None), "full academic year");

        let query = PeriodQuery {
            period: Some("2024-02-01,2024-03-31".to_string()),
        };
        let range = query.range().unwrap();
        assert_eq!(PeriodQuery::label(range), "2024-02-01,2024-03-31");

        let bad = PeriodQuery {
            period: Some("fevereiro".to_string()),
        };
        assert!(bad.range().is_err());
    }

    #[test]
    fn test_group_rows_keeps_session_order() {
        let s1 = AttendanceSessionId::new();
        let s2 = AttendanceSessionId::new();
        let a = UserId::new();
        let b = UserId::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let row = |session_id, student_id, status| AttendanceMarkRow {
            session_id,
            subject: "Math".to_string(),
            date,
            student_id,
            status,
        };

        let records = AttendanceRecord::group_rows(vec![
            row(s2, a, AttendanceStatus::Present),
            row(s1, a, AttendanceStatus::Absent),
            row(s2, b, AttendanceStatus::Justified),
        ]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, s2);
        assert_eq!(records[0].marks.len(), 2);
        assert_eq!(records[0].status_of(b), Some(AttendanceStatus::Justified));
        assert_eq!(records[1].status_of(b), None);
    }
}
