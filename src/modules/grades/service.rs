use anyhow::anyhow;
use escola_core::{AppError, PaginationMeta, PaginationParams, UserRole};
use escola_models::report_card::{
    AttendanceMarkRow, AttendanceRecord, GradeRecord, OneDecimal, ReportCard,
};
use escola_models::{GradeId, UserId};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::grades::model::{
    CreateGradeDto, DateRange, GradeFilterParams, GradeView, PaginatedGradesResponse, StudentRef,
    SubjectAverage, UpdateGradeDto,
};
use crate::modules::grades::report_card::build_report_card;

const GRADE_VIEW_SELECT: &str = r#"SELECT g.id, g.student_id, s.name AS student_name, g.subject,
       g.value, g.bimester, g.recorded_by, t.name AS teacher_name, g.created_at, g.updated_at
  FROM grades g
  JOIN users s ON s.id = g.student_id
  JOIN users t ON t.id = g.recorded_by"#;

#[derive(Debug, Clone, FromRow)]
pub struct StudentAccess {
    pub id: UserId,
    pub name: String,
    pub guardian_id: Option<UserId>,
}

impl StudentAccess {
    /// Students see themselves, guardians their dependents, staff everyone.
    pub fn visible_to(&self, caller: Caller) -> bool {
        match caller.role {
            UserRole::Student => self.id == caller.id,
            UserRole::Guardian => self.guardian_id == Some(caller.id),
            UserRole::Teacher | UserRole::Manager => true,
        }
    }

    pub fn to_ref(&self) -> StudentRef {
        StudentRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Mean of the per-student averages, each rounded to one decimal first.
pub fn overall_average(values: &[(UserId, f64)]) -> (OneDecimal, i64) {
    let mut per_student: Vec<(UserId, f64, u32)> = Vec::new();
    for &(student_id, value) in values {
        match per_student.iter_mut().find(|(id, _, _)| *id == student_id) {
            Some(entry) => {
                entry.1 += value;
                entry.2 += 1;
            }
            None => per_student.push((student_id, value, 1)),
        }
    }

    if per_student.is_empty() {
        return (OneDecimal::ZERO, 0);
    }

    let sum: f64 = per_student
        .iter()
        .map(|(_, total, count)| OneDecimal::round(total / f64::from(*count)).value())
        .sum();
    let students = per_student.len();
    (OneDecimal::round(sum / students as f64), students as i64)
}

pub struct GradeService;

impl GradeService {
    #[instrument(skip(db))]
    pub async fn find_student(db: &PgPool, student_id: UserId) -> Result<StudentAccess, AppError> {
        sqlx::query_as::<_, StudentAccess>(
            "SELECT id, name, guardian_id FROM users WHERE id = $1 AND role = $2",
        )
        .bind(student_id)
        .bind(UserRole::Student)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))
    }

    /// Loads the student and checks the caller may see their records.
    pub async fn authorize_student(
        db: &PgPool,
        caller: Caller,
        student_id: UserId,
    ) -> Result<StudentAccess, AppError> {
        if caller.role == UserRole::Student && caller.id != student_id {
            return Err(AppError::forbidden("Students may only access their own records"));
        }

        let student = Self::find_student(db, student_id).await?;
        if !student.visible_to(caller) {
            return Err(AppError::forbidden("Access denied to this student's records"));
        }
        Ok(student)
    }

    async fn find_view(db: &PgPool, grade_id: GradeId) -> Result<GradeView, AppError> {
        sqlx::query_as::<_, GradeView>(&format!("{} WHERE g.id = $1", GRADE_VIEW_SELECT))
            .bind(grade_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Grade not found")))
    }

    #[instrument(skip(db))]
    pub async fn create_grade(
        db: &PgPool,
        recorded_by: UserId,
        dto: CreateGradeDto,
    ) -> Result<GradeView, AppError> {
        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
            .bind(dto.student_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Student not found")))?;

        if role != UserRole::Student {
            return Err(AppError::bad_request(anyhow!(
                "Grades can only be recorded for students"
            )));
        }

        let subject = dto.subject.trim();
        if subject.is_empty() {
            return Err(AppError::unprocessable(anyhow!("subject must not be blank")));
        }

        let grade_id = sqlx::query_scalar::<_, GradeId>(
            r#"INSERT INTO grades (student_id, subject, value, bimester, recorded_by)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id"#,
        )
        .bind(dto.student_id)
        .bind(subject)
        .bind(dto.value)
        .bind(dto.bimester)
        .bind(recorded_by)
        .fetch_one(db)
        .await?;

        Self::find_view(db, grade_id).await
    }

    /// Students get their own grades, guardians the grades of their dependents.
    #[instrument(skip(db))]
    pub async fn list_for_learner(db: &PgPool, caller: Caller) -> Result<Vec<GradeView>, AppError> {
        let condition = match caller.role {
            UserRole::Guardian => "s.guardian_id = $1",
            _ => "g.student_id = $1",
        };
        let query = format!(
            "{} WHERE {} ORDER BY g.bimester, g.subject, g.created_at",
            GRADE_VIEW_SELECT, condition
        );

        let grades = sqlx::query_as::<_, GradeView>(&query)
            .bind(caller.id)
            .fetch_all(db)
            .await?;

        Ok(grades)
    }

    #[instrument(skip(db))]
    pub async fn list_all(
        db: &PgPool,
        pagination: PaginationParams,
    ) -> Result<PaginatedGradesResponse, AppError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grades")
            .fetch_one(db)
            .await?;

        let query = format!(
            "{} ORDER BY s.name, g.student_id, g.bimester, g.subject LIMIT $1 OFFSET $2",
            GRADE_VIEW_SELECT
        );
        let data = sqlx::query_as::<_, GradeView>(&query)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(PaginatedGradesResponse {
            data,
            meta: PaginationMeta::new(total, &pagination),
        })
    }

    /// Filtered view, newest first, scoped by the caller's role.
    #[instrument(skip(db))]
    pub async fn filter_grades(
        db: &PgPool,
        caller: Caller,
        filters: GradeFilterParams,
    ) -> Result<Vec<GradeView>, AppError> {
        let scope = match caller.role {
            UserRole::Student => "g.student_id = $1",
            UserRole::Guardian => "s.guardian_id = $1",
            UserRole::Teacher => "g.recorded_by = $1",
            UserRole::Manager => "$1::uuid IS NOT NULL",
        };
        let query = format!(
            r#"{} WHERE {}
                 AND ($2::text IS NULL OR g.subject = $2)
                 AND ($3::smallint IS NULL OR g.bimester = $3)
                 AND ($4::uuid IS NULL OR g.student_id = $4)
               ORDER BY g.created_at DESC"#,
            GRADE_VIEW_SELECT, scope
        );

        let grades = sqlx::query_as::<_, GradeView>(&query)
            .bind(caller.id)
            .bind(filters.subject)
            .bind(filters.bimester)
            .bind(filters.student_id)
            .fetch_all(db)
            .await?;

        Ok(grades)
    }

    /// Loads the inputs of the report card and aggregates them.
    ///
    /// The period restricts attendance sessions only; grades always cover the
    /// whole academic year.
    #[instrument(skip(db))]
    pub async fn report_card(
        db: &PgPool,
        student_id: UserId,
        period: Option<DateRange>,
    ) -> Result<ReportCard, AppError> {
        let grades = sqlx::query_as::<_, GradeRecord>(
            r#"SELECT g.id, g.subject, g.value, g.bimester, t.name AS teacher_name, g.created_at
               FROM grades g
               LEFT JOIN users t ON t.id = g.recorded_by
               WHERE g.student_id = $1
               ORDER BY g.subject, g.bimester, g.created_at"#,
        )
        .bind(student_id)
        .fetch_all(db)
        .await?;

        let rows = sqlx::query_as::<_, AttendanceMarkRow>(
            r#"SELECT s.id AS session_id, c.subject, s.date, e.student_id, e.status
               FROM attendance_sessions s
               JOIN classes c ON c.id = s.class_id
               JOIN attendance_entries e ON e.session_id = s.id
               WHERE e.student_id = $1
                 AND ($2::date IS NULL OR s.date >= $2)
                 AND ($3::date IS NULL OR s.date <= $3)
               ORDER BY s.date, s.id"#,
        )
        .bind(student_id)
        .bind(period.map(|p| p.start))
        .bind(period.map(|p| p.end))
        .fetch_all(db)
        .await?;

        let attendance = AttendanceRecord::group_rows(rows);
        Ok(build_report_card(&grades, &attendance, student_id))
    }

    #[instrument(skip(db))]
    pub async fn subject_average(
        db: &PgPool,
        caller: Caller,
        subject: &str,
    ) -> Result<SubjectAverage, AppError> {
        let values = sqlx::query_as::<_, (UserId, f64)>(
            r#"SELECT student_id, value FROM grades
               WHERE subject = $1 AND ($2::uuid IS NULL OR student_id = $2)"#,
        )
        .bind(subject)
        .bind((caller.role == UserRole::Student).then_some(caller.id))
        .fetch_all(db)
        .await?;

        let (average, total_students) = overall_average(&values);

        if caller.role == UserRole::Student {
            let average = if total_students == 0 {
                "0".to_string()
            } else {
                average.to_string()
            };
            return Ok(SubjectAverage::Student {
                subject: subject.to_string(),
                average,
            });
        }

        Ok(SubjectAverage::Overall {
            subject: subject.to_string(),
            overall_average: average.to_string(),
            total_students,
        })
    }

    /// Teachers may only touch grades they recorded; managers any grade.
    async fn authorize_edit(db: &PgPool, caller: Caller, grade_id: GradeId) -> Result<(), AppError> {
        let recorded_by =
            sqlx::query_scalar::<_, UserId>("SELECT recorded_by FROM grades WHERE id = $1")
                .bind(grade_id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow!("Grade not found")))?;

        if caller.role != UserRole::Manager && recorded_by != caller.id {
            return Err(AppError::forbidden(
                "Only the teacher who recorded this grade may change it",
            ));
        }
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn update_grade(
        db: &PgPool,
        caller: Caller,
        grade_id: GradeId,
        dto: UpdateGradeDto,
    ) -> Result<GradeView, AppError> {
        Self::authorize_edit(db, caller, grade_id).await?;

        let subject = dto.subject.as_deref().map(str::trim);
        if subject.is_some_and(str::is_empty) {
            return Err(AppError::unprocessable(anyhow!("subject must not be blank")));
        }

        sqlx::query(
            r#"UPDATE grades
               SET subject = COALESCE($2, subject),
                   value = COALESCE($3, value),
                   bimester = COALESCE($4, bimester),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(grade_id)
        .bind(subject)
        .bind(dto.value)
        .bind(dto.bimester)
        .execute(db)
        .await?;

        Self::find_view(db, grade_id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_grade(db: &PgPool, caller: Caller, grade_id: GradeId) -> Result<(), AppError> {
        Self::authorize_edit(db, caller, grade_id).await?;

        sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(grade_id)
            .execute(db)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(guardian_id: Option<UserId>) -> StudentAccess {
        StudentAccess {
            id: UserId::new(),
            name: "Maria".to_string(),
            guardian_id,
        }
    }

    #[test]
    fn test_students_see_only_themselves() {
        let s = student(None);
        assert!(s.visible_to(Caller {
            id: s.id,
            role: UserRole::Student
        }));
        assert!(!s.visible_to(Caller {
            id: UserId::new(),
            role: UserRole::Student
        }));
    }

    #[test]
    fn test_guardians_see_only_dependents() {
        let guardian = UserId::new();
        let s = student(Some(guardian));
        assert!(s.visible_to(Caller {
            id: guardian,
            role: UserRole::Guardian
        }));
        assert!(!s.visible_to(Caller {
            id: UserId::new(),
            role: UserRole::Guardian
        }));
        assert!(!student(None).visible_to(Caller {
            id: guardian,
            role: UserRole::Guardian
        }));
    }

    #[test]
    fn test_staff_see_everyone() {
        let s = student(None);
        for role in [UserRole::Teacher, UserRole::Manager] {
            assert!(s.visible_to(Caller {
                id: UserId::new(),
                role
            }));
        }
    }

    #[test]
    fn test_overall_average_rounds_per_student_first() {
        let a = UserId::new();
        let b = UserId::new();
        // a: (7 + 8 + 8) / 3 = 7.67 -> 7.7; b: 5.0; overall (7.7 + 5.0) / 2 = 6.35 -> 6.4
        let values = vec![(a, 7.0), (b, 5.0), (a, 8.0), (a, 8.0)];
        let (average, students) = overall_average(&values);
        assert_eq!(average.to_string(), "6.4");
        assert_eq!(students, 2);
    }

    #[test]
    fn test_overall_average_without_grades() {
        let (average, students) = overall_average(&[]);
        assert_eq!(average.to_string(), "0.0");
        assert_eq!(students, 0);
    }
}
