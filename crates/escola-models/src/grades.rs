//! Grades (notas) and their query DTOs.

use chrono::{DateTime, Utc};
use escola_core::serde::{deserialize_optional_i16, deserialize_optional_string, deserialize_optional_uuid};
use escola_core::PaginationMeta;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{GradeId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Grade {
    pub id: GradeId,
    pub student_id: UserId,
    pub subject: String,
    /// Score between 0 and 10
    pub value: f64,
    /// Bimester 1 to 4
    pub bimester: i16,
    /// Teacher or manager who recorded it
    pub recorded_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grade joined with the student and recorder names.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct GradeView {
    pub id: GradeId,
    pub student_id: UserId,
    pub student_name: String,
    pub subject: String,
    pub value: f64,
    pub bimester: i16,
    pub recorded_by: UserId,
    pub teacher_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGradeDto {
    pub student_id: UserId,
    #[validate(length(min = 1, max = 100, message = "subject must have between 1 and 100 characters"))]
    pub subject: String,
    #[validate(range(min = 0.0, max = 10.0, message = "value must be between 0 and 10"))]
    pub value: f64,
    #[validate(range(min = 1, max = 4, message = "bimester must be between 1 and 4"))]
    pub bimester: i16,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGradeDto {
    #[validate(length(min = 1, max = 100, message = "subject must have between 1 and 100 characters"))]
    pub subject: Option<String>,
    #[validate(range(min = 0.0, max = 10.0, message = "value must be between 0 and 10"))]
    pub value: Option<f64>,
    #[validate(range(min = 1, max = 4, message = "bimester must be between 1 and 4"))]
    pub bimester: Option<i16>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct GradeFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i16")]
    pub bimester: Option<i16>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedGradesResponse {
    pub data: Vec<GradeView>,
    pub meta: PaginationMeta,
}

/// `GET /grades/average/{subject}` answer; its shape depends on the caller.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SubjectAverage {
    Student {
        subject: String,
        #[schema(value_type = String, example = "7.5")]
        average: String,
    },
    Overall {
        subject: String,
        #[schema(value_type = String, example = "6.8")]
        overall_average: String,
        total_students: i64,
    },
}
