//! Classes and enrollments, one class per subject and cohort.

use chrono::{Datelike, Utc};
use escola_models::{ClassId, UserId};
use sqlx::PgPool;
use std::time::Instant;

use super::models::{ClassSeed, SUBJECTS, SeedConfig, SeededClass};
use super::users::SEED_EMAIL_DOMAIN;

pub fn generate_classes(config: &SeedConfig, teachers: &[UserId]) -> Vec<ClassSeed> {
    if teachers.is_empty() {
        return Vec::new();
    }
    let year = Utc::now().year();

    (0..config.classes)
        .map(|i| ClassSeed {
            name: format!("Turma {}", i / SUBJECTS.len() + 1),
            year,
            subject: SUBJECTS[i % SUBJECTS.len()].to_string(),
            teacher_id: teachers[i % teachers.len()],
        })
        .collect()
}

/// Splits students round-robin across cohorts.
pub fn cohort_students(students: &[UserId], cohorts: usize, cohort: usize) -> Vec<UserId> {
    students
        .iter()
        .enumerate()
        .filter(|(idx, _)| idx % cohorts.max(1) == cohort)
        .map(|(_, id)| *id)
        .collect()
}

pub async fn seed_classes(
    db: &PgPool,
    config: &SeedConfig,
    teachers: &[UserId],
    students: &[UserId],
) -> Result<Vec<SeededClass>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} classes...", config.classes);

    let seeds = generate_classes(config, teachers);
    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO classes (name, year, subject, teacher_id) VALUES ");
    for i in 0..seeds.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 4;
        query.push_str(&format!("(${}, ${}, ${}, ${})", p + 1, p + 2, p + 3, p + 4));
    }
    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for seed in &seeds {
        q = q
            .bind(&seed.name)
            .bind(seed.year)
            .bind(&seed.subject)
            .bind(seed.teacher_id);
    }

    let mut tx = db.begin().await?;
    let ids: Vec<ClassId> = q.fetch_all(&mut *tx).await?;

    let cohorts = config.cohorts();
    let classes: Vec<SeededClass> = ids
        .into_iter()
        .zip(seeds)
        .enumerate()
        .map(|(i, (id, seed))| SeededClass {
            id,
            subject: seed.subject,
            teacher_id: seed.teacher_id,
            students: cohort_students(students, cohorts, i / SUBJECTS.len()),
        })
        .collect();

    let pairs: Vec<(ClassId, UserId)> = classes
        .iter()
        .flat_map(|c| c.students.iter().map(move |s| (c.id, *s)))
        .collect();

    const BATCH_SIZE: usize = 5000;
    for chunk in pairs.chunks(BATCH_SIZE) {
        let mut query = String::from("INSERT INTO class_students (class_id, student_id) VALUES ");
        for i in 0..chunk.len() {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str(&format!("(${}, ${})", i * 2 + 1, i * 2 + 2));
        }
        query.push_str(" ON CONFLICT DO NOTHING");

        let mut q = sqlx::query(&query);
        for (class_id, student_id) in chunk {
            q = q.bind(class_id).bind(student_id);
        }
        q.execute(&mut *tx).await?;
    }

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} classes and {} enrollments in {:?}",
        classes.len(),
        pairs.len(),
        start_time.elapsed()
    );

    Ok(classes)
}

/// Deletes classes taught by seeded teachers; sessions and enrollments cascade.
pub async fn clear_classes(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let deleted = sqlx::query(
        "DELETE FROM classes WHERE teacher_id IN (SELECT id FROM users WHERE email LIKE $1)",
    )
    .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
    .execute(db)
    .await?
    .rows_affected();

    println!("   ✓ Deleted {} classes", deleted);
    Ok(deleted)
}
