//! Homework tasks assigned by a teacher to a student.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{TaskId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub student_id: UserId,
    pub student_name: String,
    pub teacher_id: UserId,
    pub teacher_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTaskDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "description must have at most 2000 characters"))]
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub student_id: UserId,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTaskDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "description must have at most 2000 characters"))]
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_is_required() {
        let dto = CreateTaskDto {
            title: String::new(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            student_id: UserId::new(),
        };
        assert!(dto.validate().is_err());
    }
}
