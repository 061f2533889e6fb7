//! Report card (boletim) aggregation.
//!
//! [`build_report_card`] is a pure function over already-loaded grades and
//! attendance sessions. It never fails: a record that slipped past request
//! validation (NaN, out-of-range value, unknown bimester) is skipped and
//! logged. [`threshold_alerts`] then derives the low-average and
//! low-attendance events for the notification dispatcher.

use escola_config::NotificationConfig;
use escola_models::UserId;
use escola_models::report_card::{
    AttendanceRecord, AttendanceSummary, BimesterSummary, GradeLine, GradeRecord, OneDecimal,
    ReportCard, SubjectReport,
};
use std::collections::BTreeMap;
use tracing::warn;

use crate::modules::notifications::NotificationEvent;

pub const BIMESTERS: [u8; 4] = [1, 2, 3, 4];

#[derive(Default)]
struct SubjectAccumulator {
    grades: Vec<GradeLine>,
    bimesters: BTreeMap<u8, (f64, u32)>,
    attendance: AttendanceSummary,
}

fn valid_bimester(bimester: i16) -> Option<u8> {
    u8::try_from(bimester).ok().filter(|b| BIMESTERS.contains(b))
}

fn accumulator<'a>(
    subjects: &'a mut Vec<(String, SubjectAccumulator)>,
    subject: &str,
) -> &'a mut SubjectAccumulator {
    let index = match subjects.iter().position(|(name, _)| name == subject) {
        Some(index) => index,
        None => {
            subjects.push((subject.to_string(), SubjectAccumulator::default()));
            subjects.len() - 1
        }
    };
    &mut subjects[index].1
}

/// Builds the per-subject report for `student_id`.
///
/// Grade subjects keep their first-occurrence order; subjects known only from
/// attendance follow in the order of the date-sorted sessions. Sessions
/// without a mark for the student are ignored.
pub fn build_report_card(
    grades: &[GradeRecord],
    attendance: &[AttendanceRecord],
    student_id: UserId,
) -> ReportCard {
    let mut subjects: Vec<(String, SubjectAccumulator)> = Vec::new();

    for grade in grades {
        let Some(bimester) = valid_bimester(grade.bimester) else {
            warn!(grade_id = %grade.id, bimester = grade.bimester, "skipping grade with unknown bimester");
            continue;
        };
        if !grade.value.is_finite() || !(0.0..=10.0).contains(&grade.value) {
            warn!(grade_id = %grade.id, value = grade.value, "skipping grade with out-of-range value");
            continue;
        }

        let acc = accumulator(&mut subjects, &grade.subject);
        acc.grades.push(GradeLine {
            id: grade.id,
            value: grade.value,
            bimester: grade.bimester,
            recorded_at: grade.created_at,
            teacher_name: grade.teacher_name.clone(),
        });
        let entry = acc.bimesters.entry(bimester).or_insert((0.0, 0));
        entry.0 += grade.value;
        entry.1 += 1;
    }

    let mut sessions: Vec<&AttendanceRecord> = attendance.iter().collect();
    sessions.sort_by_key(|s| s.date);

    for session in sessions {
        if let Some(status) = session.status_of(student_id) {
            accumulator(&mut subjects, &session.subject)
                .attendance
                .record(status);
        }
    }

    let reports = subjects
        .into_iter()
        .map(|(subject, acc)| finalize_subject(subject, acc))
        .collect();

    ReportCard::new(reports)
}

fn finalize_subject(subject: String, acc: SubjectAccumulator) -> SubjectReport {
    let bimesters: BTreeMap<u8, BimesterSummary> = BIMESTERS
        .iter()
        .map(|&b| {
            let (sum, count) = acc.bimesters.get(&b).copied().unwrap_or((0.0, 0));
            let average = (count > 0).then(|| OneDecimal::round(sum / f64::from(count)));
            (b, BimesterSummary { sum, count, average })
        })
        .collect();

    let averages: Vec<f64> = bimesters
        .values()
        .filter_map(|b| b.average.map(OneDecimal::value))
        .collect();
    let final_average = if averages.is_empty() {
        OneDecimal::ZERO
    } else {
        OneDecimal::round(averages.iter().sum::<f64>() / averages.len() as f64)
    };

    let mut attendance = acc.attendance;
    attendance.finalize();

    SubjectReport {
        subject,
        grades: acc.grades,
        bimesters,
        final_average,
        attendance,
    }
}

/// Low-average and low-attendance events, at most one of each per subject.
///
/// A subject whose student never had a class reports 0% attendance and
/// therefore alerts as well.
pub fn threshold_alerts(
    report: &ReportCard,
    student_id: UserId,
    config: &NotificationConfig,
) -> Vec<NotificationEvent> {
    let mut events = Vec::new();

    for subject in report.subjects() {
        if subject.final_average.value() < config.low_average_threshold {
            events.push(NotificationEvent::LowAverage {
                student_id,
                subject: subject.subject.clone(),
                average: subject.final_average,
            });
        }

        let percentage = subject.attendance.percentage_value();
        if percentage < config.low_attendance_threshold {
            events.push(NotificationEvent::LowAttendance {
                student_id,
                subject: subject.subject.clone(),
                percentage: OneDecimal::round(percentage),
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use escola_models::attendance::AttendanceStatus;
    use escola_models::report_card::AttendanceMark;
    use escola_models::{AttendanceSessionId, GradeId};

    fn grade(subject: &str, value: f64, bimester: i16) -> GradeRecord {
        GradeRecord {
            id: GradeId::new(),
            subject: subject.to_string(),
            value,
            bimester,
            teacher_name: Some("Prof. Carlos".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn session(subject: &str, day: u32, marks: &[(UserId, AttendanceStatus)]) -> AttendanceRecord {
        AttendanceRecord {
            session_id: AttendanceSessionId::new(),
            subject: subject.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            marks: marks
                .iter()
                .map(|&(student_id, status)| AttendanceMark { student_id, status })
                .collect(),
        }
    }

    fn present_sessions(
        subject: &str,
        student: UserId,
        present: usize,
        absent: usize,
    ) -> Vec<AttendanceRecord> {
        let mut sessions = Vec::new();
        for i in 0..present + absent {
            let status = if i < present {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            sessions.push(session(subject, (i + 1) as u32, &[(student, status)]));
        }
        sessions
    }

    #[test]
    fn test_final_average_ignores_empty_bimesters() {
        let student = UserId::new();
        let grades = vec![
            grade("Matemática", 6.0, 1),
            grade("Matemática", 8.0, 1),
            grade("Matemática", 5.0, 3),
        ];

        let report = build_report_card(&grades, &[], student);
        let math = report.subject("Matemática").unwrap();

        assert_eq!(math.bimesters[&1].count, 2);
        assert_eq!(math.bimesters[&1].average, Some(OneDecimal::round(7.0)));
        assert_eq!(math.bimesters[&2].average, None);
        assert_eq!(math.bimesters[&3].average, Some(OneDecimal::round(5.0)));
        assert_eq!(math.final_average.to_string(), "6.0");
        assert_eq!(math.bimesters.len(), 4);
    }

    #[test]
    fn test_bimester_average_is_rounded_half_up() {
        let grades = vec![
            grade("Português", 7.0, 2),
            grade("Português", 8.0, 2),
            grade("Português", 8.0, 2),
        ];
        let report = build_report_card(&grades, &[], UserId::new());
        let summary = &report.subjects()[0].bimesters[&2];
        assert_eq!(summary.sum, 23.0);
        assert_eq!(summary.average.unwrap().to_string(), "7.7");
    }

    #[test]
    fn test_attendance_percentage_counts_justified() {
        let student = UserId::new();
        let mut sessions = Vec::new();
        let statuses = [
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Present,
            AttendanceStatus::Justified,
            AttendanceStatus::Justified,
            AttendanceStatus::Absent,
            AttendanceStatus::Absent,
        ];
        for (i, status) in statuses.into_iter().enumerate() {
            sessions.push(session("Geografia", (i + 1) as u32, &[(student, status)]));
        }

        let report = build_report_card(&[grade("Geografia", 9.0, 1)], &sessions, student);
        let json = serde_json::to_value(&report).unwrap();
        let attendance = &json[0]["attendance"];

        assert_eq!(attendance["total_classes"], 10);
        assert_eq!(attendance["present"], 6);
        assert_eq!(attendance["justified"], 2);
        assert_eq!(attendance["absent"], 2);
        assert_eq!(attendance["percentage"], "80.0");
    }

    #[test]
    fn test_subject_without_attendance_reports_zero() {
        let report = build_report_card(&[grade("Artes", 9.0, 1)], &[], UserId::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json[0]["attendance"]["total_classes"], 0);
        assert_eq!(json[0]["attendance"]["percentage"], "0");
    }

    #[test]
    fn test_attendance_only_subject_has_zero_final_average() {
        let student = UserId::new();
        let sessions = present_sessions("Física", student, 2, 0);

        let report = build_report_card(&[], &sessions, student);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json[0]["subject"], "Física");
        assert_eq!(json[0]["final_average"], "0.0");
        assert_eq!(json[0]["grades"].as_array().unwrap().len(), 0);
        assert_eq!(json[0]["attendance"]["percentage"], "100.0");
    }

    #[test]
    fn test_subject_order_grades_first_then_sessions_by_date() {
        let student = UserId::new();
        let grades = vec![
            grade("História", 7.0, 1),
            grade("Matemática", 7.0, 1),
            grade("História", 8.0, 2),
        ];
        let sessions = vec![
            session("Química", 20, &[(student, AttendanceStatus::Present)]),
            session("Biologia", 5, &[(student, AttendanceStatus::Present)]),
            session("Matemática", 1, &[(student, AttendanceStatus::Absent)]),
        ];

        let report = build_report_card(&grades, &sessions, student);
        let order: Vec<&str> = report.subjects().iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(order, vec!["História", "Matemática", "Biologia", "Química"]);
    }

    #[test]
    fn test_sessions_without_the_student_are_ignored() {
        let student = UserId::new();
        let other = UserId::new();
        let sessions = vec![
            session("Inglês", 1, &[(other, AttendanceStatus::Present)]),
            session(
                "Inglês",
                2,
                &[
                    (other, AttendanceStatus::Absent),
                    (student, AttendanceStatus::Present),
                ],
            ),
        ];

        let report = build_report_card(&[], &sessions, student);
        assert_eq!(report.subjects()[0].attendance.total_classes, 1);
    }

    #[test]
    fn test_malformed_grades_are_skipped() {
        let grades = vec![
            grade("Matemática", f64::NAN, 1),
            grade("Matemática", 11.0, 1),
            grade("Matemática", 7.0, 5),
            grade("Matemática", 7.0, 0),
            grade("Matemática", 4.0, 2),
        ];

        let report = build_report_card(&grades, &[], UserId::new());
        let math = &report.subjects()[0];
        assert_eq!(math.grades.len(), 1);
        assert_eq!(math.final_average.to_string(), "4.0");
    }

    #[test]
    fn test_empty_input_gives_empty_report() {
        let report = build_report_card(&[], &[], UserId::new());
        assert!(report.is_empty());
        assert_eq!(serde_json::to_string(&report).unwrap(), "[]");
    }

    #[test]
    fn test_build_is_deterministic() {
        let student = UserId::new();
        let grades = vec![grade("A", 7.3, 1), grade("B", 5.5, 2), grade("A", 8.8, 4)];
        let sessions = present_sessions("B", student, 3, 1);

        let first = serde_json::to_string(&build_report_card(&grades, &sessions, student)).unwrap();
        let second =
            serde_json::to_string(&build_report_card(&grades, &sessions, student)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_averages_stay_within_bounds() {
        let values = [0.0, 0.1, 3.33, 5.55, 6.65, 9.95, 10.0];
        for &a in &values {
            for &b in &values {
                let report = build_report_card(
                    &[grade("X", a, 1), grade("X", b, 1)],
                    &[],
                    UserId::new(),
                );
                let avg = report.subjects()[0].bimesters[&1].average.unwrap().value();
                assert!((0.0..=10.0).contains(&avg), "{} out of range", avg);
            }
        }
    }

    #[test]
    fn test_low_average_alert_threshold() {
        let student = UserId::new();
        let config = NotificationConfig::default();

        let sessions = present_sessions("Matemática", student, 4, 0);
        let below = build_report_card(&[grade("Matemática", 5.9, 1)], &sessions, student);
        let alerts = threshold_alerts(&below, student, &config);
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            alerts[0],
            NotificationEvent::LowAverage {
                student_id: student,
                subject: "Matemática".to_string(),
                average: OneDecimal::round(5.9),
            }
        );

        let at = build_report_card(&[grade("Matemática", 6.0, 1)], &sessions, student);
        assert!(threshold_alerts(&at, student, &config).is_empty());
    }

    #[test]
    fn test_low_attendance_alert_threshold() {
        let student = UserId::new();
        let config = NotificationConfig::default();

        // 3 of 4 is exactly 75%: no alert
        let at = build_report_card(
            &[grade("Física", 8.0, 1)],
            &present_sessions("Física", student, 3, 1),
            student,
        );
        assert!(threshold_alerts(&at, student, &config).is_empty());

        // 2 of 3 is 66.7%
        let below = build_report_card(
            &[grade("Física", 8.0, 1)],
            &present_sessions("Física", student, 2, 1),
            student,
        );
        let alerts = threshold_alerts(&below, student, &config);
        assert_eq!(alerts.len(), 1);
        assert!(matches!(
            &alerts[0],
            NotificationEvent::LowAttendance { percentage, .. } if percentage.to_string() == "66.7"
        ));
    }

    #[test]
    fn test_subject_without_classes_alerts_low_attendance() {
        let student = UserId::new();
        let report = build_report_card(&[grade("Artes", 9.0, 1)], &[], student);
        let alerts = threshold_alerts(&report, student, &NotificationConfig::default());
        assert_eq!(alerts.len(), 1);
        assert!(matches!(alerts[0], NotificationEvent::LowAttendance { .. }));
    }
}
