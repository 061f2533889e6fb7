//! Fake teachers and students.

use escola_core::UserRole;
use escola_models::UserId;
use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::UserSeed;

/// Seeded accounts share this email domain; `clear_users` relies on it.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

pub fn generate_users(role: UserRole, count: usize, password_hash: &str) -> Vec<UserSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| generate_user(role, idx, password_hash))
        .collect()
}

fn generate_user(role: UserRole, idx: usize, password_hash: &str) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();

    let email = format!(
        "{}.{}+{}{}@{}",
        first_name.to_lowercase(),
        last_name.to_lowercase(),
        role,
        idx,
        SEED_EMAIL_DOMAIN
    );

    let enrollment = (role == UserRole::Student).then(|| format!("SEED{:06}", idx));

    UserSeed {
        name: format!("{} {}", first_name, last_name),
        email,
        password_hash: password_hash.to_string(),
        role,
        enrollment,
    }
}

pub async fn seed_users(
    db: &PgPool,
    role: UserRole,
    count: usize,
    password_hash: &str,
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("👥 Seeding {} {} accounts...", count, role);

    let users = generate_users(role, count, password_hash);
    let ids = insert_users_batch(db, &users).await?;

    println!(
        "   ✓ Inserted {} {} accounts in {:?}",
        ids.len(),
        role,
        start_time.elapsed()
    );

    Ok(ids)
}

pub async fn insert_users_batch(
    db: &PgPool,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    // 5 params per user
    const BATCH_SIZE: usize = 1000;

    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;
    Ok(ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query =
        String::from("INSERT INTO users (name, email, password, role, enrollment) VALUES ");

    for i in 0..users.len() {
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

    query.push_str(" RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.enrollment);
    }

    let ids: Vec<UserId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Deletes seeded accounts; managers are always kept.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded users...");

    let deleted = sqlx::query("DELETE FROM users WHERE email LIKE $1 AND role <> $2")
        .bind(format!("%@{}", SEED_EMAIL_DOMAIN))
        .bind(UserRole::Manager)
        .execute(db)
        .await?
        .rows_affected();

    println!(
        "   ✓ Deleted {} users in {:?}",
        deleted,
        start_time.elapsed()
    );

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_students_have_unique_enrollments() {
        let users = generate_users(UserRole::Student, 50, "hash");
        let mut enrollments: Vec<_> = users.iter().filter_map(|u| u.enrollment.clone()).collect();
        enrollments.sort();
        enrollments.dedup();
        assert_eq!(enrollments.len(), 50);
        assert!(users.iter().all(|u| u.email.ends_with("@example.com")));
    }

    #[test]
    fn test_teachers_have_no_enrollment() {
        let users = generate_users(UserRole::Teacher, 3, "hash");
        assert!(users.iter().all(|u| u.enrollment.is_none()));
        assert!(users.iter().all(|u| u.email.contains("+teacher")));
    }
}
