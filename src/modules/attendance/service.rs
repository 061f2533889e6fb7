use anyhow::anyhow;
use escola_core::{AppError, UserRole};
use escola_models::{AttendanceSessionId, ClassId, UserId};
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::attendance::model::{
    AttendanceEntry, AttendanceSession, AttendanceSessionWithEntries, AttendanceSummary,
    CreateAttendanceDto, JustifyAbsenceDto, StudentAttendanceLine, StudentAttendanceReport,
};
use crate::modules::grades::DateRange;
use crate::modules::grades::service::GradeService;

const SESSION_COLUMNS: &str = "id, class_id, date, recorded_by, note, created_at, updated_at";

#[derive(Debug, FromRow)]
struct ClassOwner {
    teacher_id: UserId,
}

/// Statistics over a student's sessions, with the report card formula.
pub fn summarize(lines: &[StudentAttendanceLine]) -> AttendanceSummary {
    let mut summary = AttendanceSummary::default();
    for line in lines {
        summary.record(line.status);
    }
    summary.finalize();
    summary
}

/// Ids from `requested` that are not enrolled, in request order without repeats.
pub fn unknown_students(requested: &[UserId], enrolled: &HashSet<UserId>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|id| !enrolled.contains(id) && seen.insert(**id))
        .copied()
        .collect()
}

pub struct AttendanceService;

impl AttendanceService {
    /// Staff access to a class: managers always, teachers only for their own.
    async fn authorize_class(db: &PgPool, caller: Caller, class_id: ClassId) -> Result<(), AppError> {
        let class = sqlx::query_as::<_, ClassOwner>(
            "SELECT teacher_id FROM classes WHERE id = $1 AND is_active",
        )
        .bind(class_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;

        if caller.role != UserRole::Manager && class.teacher_id != caller.id {
            return Err(AppError::forbidden("This class belongs to another teacher"));
        }
        Ok(())
    }

    async fn entries(
        db: &PgPool,
        session_ids: &[AttendanceSessionId],
    ) -> Result<Vec<AttendanceEntry>, AppError> {
        let entries = sqlx::query_as::<_, AttendanceEntry>(
            r#"SELECT e.session_id, e.student_id, u.name AS student_name, e.status, e.justification
               FROM attendance_entries e
               JOIN users u ON u.id = e.student_id
               WHERE e.session_id = ANY($1)
               ORDER BY u.name"#,
        )
        .bind(session_ids)
        .fetch_all(db)
        .await?;

        Ok(entries)
    }

    #[instrument(skip(db, dto), fields(class_id = %dto.class_id, date = %dto.date))]
    pub async fn create_session(
        db: &PgPool,
        caller: Caller,
        dto: CreateAttendanceDto,
    ) -> Result<AttendanceSessionWithEntries, AppError> {
        Self::authorize_class(db, caller, dto.class_id).await?;

        let enrolled: HashSet<UserId> = sqlx::query_scalar::<_, UserId>(
            "SELECT student_id FROM class_students WHERE class_id = $1",
        )
        .bind(dto.class_id)
        .fetch_all(db)
        .await?
        .into_iter()
        .collect();

        let requested: Vec<UserId> = dto.entries.iter().map(|e| e.student_id).collect();
        let invalid = unknown_students(&requested, &enrolled);
        if !invalid.is_empty() {
            let ids: Vec<String> = invalid.iter().map(ToString::to_string).collect();
            return Err(AppError::bad_request(anyhow!(
                "Students not enrolled in this class: {}",
                ids.join(", ")
            )));
        }

        let unique: HashSet<UserId> = requested.iter().copied().collect();
        if unique.len() != requested.len() {
            return Err(AppError::bad_request(anyhow!(
                "Each student may appear only once per session"
            )));
        }

        let mut tx = db.begin().await?;

        let session = sqlx::query_as::<_, AttendanceSession>(&format!(
            r#"INSERT INTO attendance_sessions (class_id, date, recorded_by, note)
               VALUES ($1, $2, $3, $4)
               RETURNING {}"#,
            SESSION_COLUMNS
        ))
        .bind(dto.class_id)
        .bind(dto.date)
        .bind(caller.id)
        .bind(&dto.note)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::conflict(anyhow!(
                        "Attendance was already recorded for this class on {}",
                        dto.date
                    ));
                }
            }
            AppError::from(e)
        })?;

        let mut query = String::from(
            "INSERT INTO attendance_entries (session_id, student_id, status, justification) VALUES ",
        );
        for i in 0..dto.entries.len() {
            if i > 0 {
                query.push_str(", ");
            }
            let p = i * 4;
            query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
        }

        let mut insert = sqlx::query(&query);
        for entry in &dto.entries {
            insert = insert
                .bind(session.id)
                .bind(entry.student_id)
                .bind(entry.status)
                .bind(&entry.justification);
        }
        insert.execute(&mut *tx).await?;

        tx.commit().await?;

        let entries = Self::entries(db, &[session.id]).await?;
        Ok(AttendanceSessionWithEntries { session, entries })
    }

    #[instrument(skip(db))]
    pub async fn list_for_class(
        db: &PgPool,
        caller: Caller,
        class_id: ClassId,
        date: Option<chrono::NaiveDate>,
    ) -> Result<Vec<AttendanceSessionWithEntries>, AppError> {
        Self::authorize_class(db, caller, class_id).await?;

        let sessions = sqlx::query_as::<_, AttendanceSession>(&format!(
            r#"SELECT {} FROM attendance_sessions
               WHERE class_id = $1 AND ($2::date IS NULL OR date = $2)
               ORDER BY date DESC"#,
            SESSION_COLUMNS
        ))
        .bind(class_id)
        .bind(date)
        .fetch_all(db)
        .await?;

        let ids: Vec<AttendanceSessionId> = sessions.iter().map(|s| s.id).collect();
        let mut entries = Self::entries(db, &ids).await?;

        let result = sessions
            .into_iter()
            .map(|session| {
                let (mine, rest): (Vec<_>, Vec<_>) =
                    entries.drain(..).partition(|e| e.session_id == session.id);
                entries = rest;
                AttendanceSessionWithEntries {
                    session,
                    entries: mine,
                }
            })
            .collect();

        Ok(result)
    }

    /// Marks the student's entry as justified.
    #[instrument(skip(db, dto), fields(student_id = %dto.student_id))]
    pub async fn justify_absence(
        db: &PgPool,
        caller: Caller,
        session_id: AttendanceSessionId,
        dto: JustifyAbsenceDto,
    ) -> Result<AttendanceEntry, AppError> {
        let class_id = sqlx::query_scalar::<_, ClassId>(
            "SELECT class_id FROM attendance_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Attendance session not found")))?;

        Self::authorize_class(db, caller, class_id).await?;

        let updated = sqlx::query(
            r#"UPDATE attendance_entries
               SET status = 'justified', justification = $3
               WHERE session_id = $1 AND student_id = $2"#,
        )
        .bind(session_id)
        .bind(dto.student_id)
        .bind(dto.justification.trim())
        .execute(db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!(
                "Student has no entry in this session"
            )));
        }

        sqlx::query("UPDATE attendance_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(db)
            .await?;

        Self::entries(db, &[session_id])
            .await?
            .into_iter()
            .find(|e| e.student_id == dto.student_id)
            .ok_or_else(|| AppError::not_found(anyhow!("Student has no entry in this session")))
    }

    #[instrument(skip(db))]
    pub async fn student_report(
        db: &PgPool,
        caller: Caller,
        student_id: UserId,
        period: Option<DateRange>,
        period_label: String,
    ) -> Result<StudentAttendanceReport, AppError> {
        let student = GradeService::authorize_student(db, caller, student_id).await?;

        let sessions = sqlx::query_as::<_, StudentAttendanceLine>(
            r#"SELECT s.id AS session_id, s.class_id, c.name AS class_name, c.subject, s.date,
                      e.status, e.justification
               FROM attendance_entries e
               JOIN attendance_sessions s ON s.id = e.session_id
               JOIN classes c ON c.id = s.class_id
               WHERE e.student_id = $1
                 AND ($2::date IS NULL OR s.date >= $2)
                 AND ($3::date IS NULL OR s.date <= $3)
               ORDER BY s.date DESC, c.subject"#,
        )
        .bind(student.id)
        .bind(period.map(|p| p.start))
        .bind(period.map(|p| p.end))
        .fetch_all(db)
        .await?;

        let stats = summarize(&sessions);

        Ok(StudentAttendanceReport {
            student_id: student.id,
            period: period_label,
            sessions,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::attendance::model::AttendanceStatus;
    use chrono::NaiveDate;

    fn line(status: AttendanceStatus) -> StudentAttendanceLine {
        StudentAttendanceLine {
            session_id: AttendanceSessionId::new(),
            class_id: ClassId::new(),
            class_name: "7A".to_string(),
            subject: "Matemática".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            status,
            justification: None,
        }
    }

    #[test]
    fn test_summary_uses_report_card_formula() {
        let lines = vec![
            line(AttendanceStatus::Present),
            line(AttendanceStatus::Justified),
            line(AttendanceStatus::Absent),
            line(AttendanceStatus::Absent),
        ];
        let stats = summarize(&lines);
        assert_eq!(stats.total_classes, 4);
        assert_eq!(stats.absent, 2);
        assert_eq!(stats.percentage_value(), 50.0);
    }

    #[test]
    fn test_empty_summary_percentage_is_zero_string() {
        let json = serde_json::to_value(summarize(&[])).unwrap();
        assert_eq!(json["percentage"], "0");
    }

    #[test]
    fn test_unknown_students_are_reported_once() {
        let enrolled_id = UserId::new();
        let stranger = UserId::new();
        let enrolled: HashSet<UserId> = [enrolled_id].into_iter().collect();

        let invalid = unknown_students(&[stranger, enrolled_id, stranger], &enrolled);
        assert_eq!(invalid, vec![stranger]);
        assert!(unknown_students(&[enrolled_id], &enrolled).is_empty());
    }
}
