//! Classes (turmas) owned by a teacher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{ClassId, UserId};
use crate::users::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub year: i32,
    /// Subject taught to this class; attendance is reported under it
    pub subject: String,
    pub teacher_id: UserId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClassWithStudents {
    #[serde(flatten)]
    pub class: Class,
    pub students: Vec<UserSummary>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateClassDto {
    #[validate(length(min = 1, max = 100, message = "name must have between 1 and 100 characters"))]
    pub name: String,
    #[validate(range(min = 2000, max = 2100, message = "year must be between 2000 and 2100"))]
    pub year: i32,
    #[validate(length(min = 1, max = 100, message = "subject must have between 1 and 100 characters"))]
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateClassDto {
    #[validate(length(min = 1, max = 100, message = "name must have between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 2000, max = 2100, message = "year must be between 2000 and 2100"))]
    pub year: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "subject must have between 1 and 100 characters"))]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ClassStudentsDto {
    #[validate(length(min = 1, message = "student_ids must not be empty"))]
    pub student_ids: Vec<UserId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_class_validation() {
        let dto = CreateClassDto {
            name: "7A".to_string(),
            year: 2024,
            subject: "Matemática".to_string(),
        };
        assert!(dto.validate().is_ok());

        let dto = CreateClassDto {
            year: 1990,
            ..dto
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_students_list_must_not_be_empty() {
        let dto = ClassStudentsDto {
            student_ids: vec![],
        };
        assert!(dto.validate().is_err());
    }
}
