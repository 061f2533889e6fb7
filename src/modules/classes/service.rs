use anyhow::anyhow;
use escola_core::AppError;
use escola_models::users::UserSummary;
use escola_models::{ClassId, UserId};
use sqlx::{FromRow, PgPool};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

use crate::modules::attendance::service::unknown_students;
use crate::modules::classes::model::{
    Class, ClassStudentsDto, ClassWithStudents, CreateClassDto, UpdateClassDto,
};

const CLASS_COLUMNS: &str = "id, name, year, subject, teacher_id, is_active, created_at, updated_at";

#[derive(Debug, FromRow)]
struct RosterRow {
    class_id: ClassId,
    id: UserId,
    name: String,
    email: String,
}

/// Attaches each roster row to its class, keeping class order.
pub fn attach_students(
    classes: Vec<Class>,
    roster: Vec<(ClassId, UserSummary)>,
) -> Vec<ClassWithStudents> {
    let mut by_class: HashMap<ClassId, Vec<UserSummary>> = HashMap::new();
    for (class_id, student) in roster {
        by_class.entry(class_id).or_default().push(student);
    }

    classes
        .into_iter()
        .map(|class| ClassWithStudents {
            students: by_class.remove(&class.id).unwrap_or_default(),
            class,
        })
        .collect()
}

pub struct ClassService;

impl ClassService {
    async fn find_owned(db: &PgPool, teacher_id: UserId, id: ClassId) -> Result<Class, AppError> {
        sqlx::query_as::<_, Class>(&format!(
            "SELECT {} FROM classes WHERE id = $1 AND teacher_id = $2 AND is_active",
            CLASS_COLUMNS
        ))
        .bind(id)
        .bind(teacher_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))
    }

    async fn roster(
        db: &PgPool,
        class_ids: &[ClassId],
    ) -> Result<Vec<(ClassId, UserSummary)>, AppError> {
        let rows = sqlx::query_as::<_, RosterRow>(
            r#"SELECT cs.class_id, u.id, u.name, u.email
               FROM class_students cs
               JOIN users u ON u.id = cs.student_id
               WHERE cs.class_id = ANY($1)
               ORDER BY u.name"#,
        )
        .bind(class_ids)
        .fetch_all(db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.class_id,
                    UserSummary {
                        id: row.id,
                        name: row.name,
                        email: row.email,
                    },
                )
            })
            .collect())
    }

    async fn with_students(db: &PgPool, class: Class) -> Result<ClassWithStudents, AppError> {
        let roster = Self::roster(db, std::slice::from_ref(&class.id)).await?;
        let mut classes = attach_students(vec![class], roster);
        classes
            .pop()
            .ok_or_else(|| AppError::internal(anyhow!("Class vanished while loading roster")))
    }

    #[instrument(skip(db))]
    pub async fn list_for_teacher(
        db: &PgPool,
        teacher_id: UserId,
    ) -> Result<Vec<ClassWithStudents>, AppError> {
        let classes = sqlx::query_as::<_, Class>(&format!(
            "SELECT {} FROM classes WHERE teacher_id = $1 AND is_active ORDER BY year DESC, name",
            CLASS_COLUMNS
        ))
        .bind(teacher_id)
        .fetch_all(db)
        .await?;

        let ids: Vec<ClassId> = classes.iter().map(|c| c.id).collect();
        let roster = Self::roster(db, &ids).await?;

        Ok(attach_students(classes, roster))
    }

    #[instrument(skip(db, dto))]
    pub async fn create_class(
        db: &PgPool,
        teacher_id: UserId,
        dto: CreateClassDto,
    ) -> Result<ClassWithStudents, AppError> {
        let class = sqlx::query_as::<_, Class>(&format!(
            r#"INSERT INTO classes (name, year, subject, teacher_id)
               VALUES ($1, $2, $3, $4)
               RETURNING {}"#,
            CLASS_COLUMNS
        ))
        .bind(dto.name.trim())
        .bind(dto.year)
        .bind(dto.subject.trim())
        .bind(teacher_id)
        .fetch_one(db)
        .await?;

        Ok(ClassWithStudents {
            class,
            students: vec![],
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn update_class(
        db: &PgPool,
        teacher_id: UserId,
        id: ClassId,
        dto: UpdateClassDto,
    ) -> Result<ClassWithStudents, AppError> {
        let class = sqlx::query_as::<_, Class>(&format!(
            r#"UPDATE classes
               SET name = COALESCE($3, name),
                   year = COALESCE($4, year),
                   subject = COALESCE($5, subject),
                   updated_at = NOW()
               WHERE id = $1 AND teacher_id = $2 AND is_active
               RETURNING {}"#,
            CLASS_COLUMNS
        ))
        .bind(id)
        .bind(teacher_id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.year)
        .bind(dto.subject.as_deref().map(str::trim))
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found")))?;

        Self::with_students(db, class).await
    }

    /// Enrolls students; ids already in the class are ignored.
    #[instrument(skip(db, dto))]
    pub async fn add_students(
        db: &PgPool,
        teacher_id: UserId,
        id: ClassId,
        dto: ClassStudentsDto,
    ) -> Result<ClassWithStudents, AppError> {
        let class = Self::find_owned(db, teacher_id, id).await?;

        let students: HashSet<UserId> = sqlx::query_scalar::<_, UserId>(
            "SELECT id FROM users WHERE id = ANY($1) AND role = 'student' AND is_active",
        )
        .bind(&dto.student_ids)
        .fetch_all(db)
        .await?
        .into_iter()
        .collect();

        let invalid = unknown_students(&dto.student_ids, &students);
        if !invalid.is_empty() {
            let ids: Vec<String> = invalid.iter().map(ToString::to_string).collect();
            return Err(AppError::bad_request(anyhow!(
                "Not active students: {}",
                ids.join(", ")
            )));
        }

        let added = sqlx::query(
            r#"INSERT INTO class_students (class_id, student_id)
               SELECT $1, UNNEST($2::uuid[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(id)
        .bind(&dto.student_ids)
        .execute(db)
        .await?
        .rows_affected();

        tracing::info!(class_id = %id, added, "Students enrolled");

        Self::with_students(db, class).await
    }

    #[instrument(skip(db, dto))]
    pub async fn remove_students(
        db: &PgPool,
        teacher_id: UserId,
        id: ClassId,
        dto: ClassStudentsDto,
    ) -> Result<ClassWithStudents, AppError> {
        let class = Self::find_owned(db, teacher_id, id).await?;

        let removed = sqlx::query(
            "DELETE FROM class_students WHERE class_id = $1 AND student_id = ANY($2)",
        )
        .bind(id)
        .bind(&dto.student_ids)
        .execute(db)
        .await?
        .rows_affected();

        tracing::info!(class_id = %id, removed, "Students removed");

        Self::with_students(db, class).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn class(name: &str) -> Class {
        Class {
            id: ClassId::new(),
            name: name.to_string(),
            year: 2024,
            subject: "Matemática".to_string(),
            teacher_id: UserId::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn student(name: &str) -> UserSummary {
        UserSummary {
            id: UserId::new(),
            name: name.to_string(),
            email: format!("{}@escola.test", name.to_lowercase()),
        }
    }

    #[test]
    fn test_attach_students_per_class() {
        let a = class("7A");
        let b = class("7B");
        let roster = vec![
            (a.id, student("Ana")),
            (b.id, student("Bia")),
            (a.id, student("Caio")),
        ];

        let classes = attach_students(vec![a, b], roster);

        assert_eq!(classes[0].class.name, "7A");
        let names: Vec<&str> = classes[0].students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Caio"]);
        assert_eq!(classes[1].students.len(), 1);
    }

    #[test]
    fn test_class_without_students_gets_empty_roster() {
        let classes = attach_students(vec![class("8A")], vec![]);
        assert!(classes[0].students.is_empty());
    }
}
