//! Database seeding with fake teachers, students, classes, grades and
//! attendance.
//!
//! - [`users`]: teacher and student accounts
//! - [`classes`]: classes and enrollments
//! - [`academics`]: grades and attendance sessions
//! - [`models`]: seed records and [`SeedConfig`]
//!
//! Data is generated in parallel with Rayon and inserted with multi-value
//! INSERT statements. A single low-cost bcrypt hash is shared by every account.

pub mod academics;
pub mod classes;
pub mod models;
pub mod users;

pub use models::SeedConfig;

use bcrypt::hash;
use escola_core::UserRole;
use sqlx::PgPool;
use std::time::Instant;

pub const SEED_PASSWORD: &str = "senha123";

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    println!("🌱 Starting database seeding...");
    println!("   - Teachers: {}", config.teachers);
    println!("   - Students: {}", config.students);
    println!("   - Classes: {} ({} cohorts)", config.classes, config.cohorts());

    let password_hash = hash_password()?;

    let teachers = users::seed_users(db, UserRole::Teacher, config.teachers, &password_hash).await?;
    let students = users::seed_users(db, UserRole::Student, config.students, &password_hash).await?;
    let classes = classes::seed_classes(db, &config, &teachers, &students).await?;
    let grades = academics::seed_grades(db, &classes, &config).await?;
    let sessions = academics::seed_attendance(db, &classes, &config).await?;

    println!(
        "\n✅ Seeding complete! Created {} users, {} classes, {} grades, {} attendance sessions in {:?}",
        teachers.len() + students.len(),
        classes.len(),
        grades,
        sessions,
        start_time.elapsed()
    );
    println!("\n📝 Default password for all users: {}", SEED_PASSWORD);

    Ok(())
}

pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing all seeded data...");

    // grades.recorded_by and classes.teacher_id restrict user deletion
    let pattern = format!("%@{}", users::SEED_EMAIL_DOMAIN);
    academics::clear_grades(db, &pattern).await?;
    classes::clear_classes(db).await?;
    users::clear_users(db).await?;

    println!("✅ All seeded data cleared in {:?}", start_time.elapsed());
    Ok(())
}

fn hash_password() -> Result<String, Box<dyn std::error::Error>> {
    println!("🔐 Hashing password...");
    let start = Instant::now();
    // Cost 4 keeps seeding fast; these accounts are for local use only
    let hash = hash(SEED_PASSWORD, 4).map_err(|e| format!("Failed to hash password: {}", e))?;
    println!("   ✓ Hashed password in {:?}", start.elapsed());
    Ok(hash)
}
