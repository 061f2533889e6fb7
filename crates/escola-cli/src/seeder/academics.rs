//! Grades and attendance for seeded classes.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use escola_models::attendance::AttendanceStatus;
use escola_models::AttendanceSessionId;
use fake::Fake;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{AttendanceSeed, GradeSeed, SeedConfig, SeededClass};

pub fn generate_grades(classes: &[SeededClass], config: &SeedConfig) -> Vec<GradeSeed> {
    let bimesters = config.bimesters.clamp(1, 4);
    classes
        .par_iter()
        .flat_map_iter(|class| {
            let mut grades = Vec::with_capacity(
                class.students.len() * bimesters as usize * config.grades_per_bimester,
            );
            for student_id in &class.students {
                for bimester in 1..=bimesters {
                    for _ in 0..config.grades_per_bimester {
                        let raw: f64 = (3.0..10.0).fake();
                        grades.push(GradeSeed {
                            student_id: *student_id,
                            subject: class.subject.clone(),
                            value: (raw * 10.0).round() / 10.0,
                            bimester,
                            recorded_by: class.teacher_id,
                        });
                    }
                }
            }
            grades
        })
        .collect()
}

/// The `count` most recent weekdays up to and including `today`, oldest first.
pub fn school_days(today: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = today;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day -= Duration::days(1);
    }
    days.reverse();
    days
}

fn random_status() -> AttendanceStatus {
    match (0..100u8).fake::<u8>() {
        0..=79 => AttendanceStatus::Present,
        80..=91 => AttendanceStatus::Absent,
        _ => AttendanceStatus::Justified,
    }
}

pub fn generate_attendance(classes: &[SeededClass], config: &SeedConfig) -> Vec<AttendanceSeed> {
    let days = school_days(Utc::now().date_naive(), config.attendance_days);
    classes
        .par_iter()
        .flat_map_iter(|class| {
            days.iter()
                .map(|date| AttendanceSeed {
                    class_id: class.id,
                    date: *date,
                    recorded_by: class.teacher_id,
                    marks: class
                        .students
                        .iter()
                        .map(|s| (*s, random_status()))
                        .collect(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

pub async fn seed_grades(
    db: &PgPool,
    classes: &[SeededClass],
    config: &SeedConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let grades = generate_grades(classes, config);
    println!("📝 Seeding {} grades...", grades.len());

    let mut tx = db.begin().await?;

    // 5 params per grade
    const BATCH_SIZE: usize = 1000;
    for chunk in grades.chunks(BATCH_SIZE) {
        insert_grades_chunk(&mut tx, chunk).await?;
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} grades in {:?}",
        grades.len(),
        start_time.elapsed()
    );

    Ok(grades.len())
}

async fn insert_grades_chunk(
    tx: &mut Transaction<'_, Postgres>,
    grades: &[GradeSeed],
) -> Result<(), Box<dyn std::error::Error>> {
    if grades.is_empty() {
        return Ok(());
    }

    let mut query = String::from(
        "INSERT INTO grades (student_id, subject, value, bimester, recorded_by) VALUES ",
    );
    for i in 0..grades.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 5;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5
        ));
    }

    let mut q = sqlx::query(&query);
    for grade in grades {
        q = q
            .bind(grade.student_id)
            .bind(&grade.subject)
            .bind(grade.value)
            .bind(grade.bimester)
            .bind(grade.recorded_by);
    }

    q.execute(&mut **tx).await?;
    Ok(())
}

pub async fn seed_attendance(
    db: &PgPool,
    classes: &[SeededClass],
    config: &SeedConfig,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let sessions = generate_attendance(classes, config);
    println!("📋 Seeding {} attendance sessions...", sessions.len());

    let mut tx = db.begin().await?;

    const BATCH_SIZE: usize = 1000;
    let mut marks = 0;
    for chunk in sessions.chunks(BATCH_SIZE) {
        let ids = insert_sessions_chunk(&mut tx, chunk).await?;
        let entries: Vec<_> = ids
            .iter()
            .zip(chunk)
            .flat_map(|(id, session)| session.marks.iter().map(move |(s, st)| (*id, *s, *st)))
            .collect();
        marks += entries.len();

        for entry_chunk in entries.chunks(BATCH_SIZE) {
            let mut query = String::from(
                "INSERT INTO attendance_entries (session_id, student_id, status) VALUES ",
            );
            for i in 0..entry_chunk.len() {
                if i > 0 {
                    query.push_str(", ");
                }
                let p = i * 3;
                query.push_str(&format!("(${}, ${}, ${})", p + 1, p + 2, p + 3));
            }

            let mut q = sqlx::query(&query);
            for (session_id, student_id, status) in entry_chunk {
                q = q.bind(session_id).bind(student_id).bind(status);
            }
            q.execute(&mut *tx).await?;
        }
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} sessions with {} marks in {:?}",
        sessions.len(),
        marks,
        start_time.elapsed()
    );

    Ok(sessions.len())
}

async fn insert_sessions_chunk(
    tx: &mut Transaction<'_, Postgres>,
    sessions: &[AttendanceSeed],
) -> Result<Vec<AttendanceSessionId>, Box<dyn std::error::Error>> {
    if sessions.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO attendance_sessions (class_id, date, recorded_by) VALUES ");
    for i in 0..sessions.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 3;
        query.push_str(&format!("(${}, ${}, ${})", p + 1, p + 2, p + 3));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for session in sessions {
        q = q
            .bind(session.class_id)
            .bind(session.date)
            .bind(session.recorded_by);
    }

    let ids: Vec<AttendanceSessionId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Deletes grades given to or recorded by seeded accounts.
pub async fn clear_grades(db: &PgPool, email_pattern: &str) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query(
        "DELETE FROM grades
         WHERE recorded_by IN (SELECT id FROM users WHERE email LIKE $1)
            OR student_id IN (SELECT id FROM users WHERE email LIKE $1)",
    )
    .bind(email_pattern)
    .execute(db)
    .await?
    .rows_affected();

    println!("   ✓ Deleted {} grades", deleted);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use escola_models::{ClassId, UserId};

    fn class(students: usize) -> SeededClass {
        SeededClass {
            id: ClassId::new(),
            subject: "Matemática".to_string(),
            teacher_id: UserId::new(),
            students: (0..students).map(|_| UserId::new()).collect(),
        }
    }

    #[test]
    fn test_school_days_skip_weekends() {
        // 2024-03-11 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let days = school_days(monday, 3);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
                monday,
            ]
        );
    }

    #[test]
    fn test_generated_grades_are_valid() {
        let config = SeedConfig::default();
        let grades = generate_grades(&[class(4), class(3)], &config);

        let expected = 7 * config.bimesters as usize * config.grades_per_bimester;
        assert_eq!(grades.len(), expected);
        assert!(grades.iter().all(|g| (0.0..=10.0).contains(&g.value)));
        assert!(grades.iter().all(|g| (1..=4).contains(&g.bimester)));
    }

    #[test]
    fn test_attendance_marks_every_student() {
        let config = SeedConfig::default().with_attendance_days(5);
        let sessions = generate_attendance(&[class(6)], &config);
        assert_eq!(sessions.len(), 5);
        assert!(sessions.iter().all(|s| s.marks.len() == 6));
    }
}
