//! Announcements (comunicados) addressed to everyone, a class or a set of users.

use chrono::{DateTime, Utc};
use escola_core::serde::deserialize_optional_uuid;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::ids::{AnnouncementId, ClassId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "announcement_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    General,
    Class,
    Student,
    Teacher,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "announcement_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub recipient_ids: Vec<UserId>,
    pub class_id: Option<ClassId>,
    pub author_id: UserId,
    pub author_name: String,
    pub priority: AnnouncementPriority,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the caller already acknowledged it
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_audience(dto: &CreateAnnouncementDto) -> Result<(), ValidationError> {
    match dto.kind {
        AnnouncementKind::Class if dto.class_id.is_none() => Err(ValidationError::new("class_id")
            .with_message("class_id is required for class announcements".into())),
        AnnouncementKind::Student | AnnouncementKind::Teacher if dto.recipient_ids.is_empty() => {
            Err(ValidationError::new("recipient_ids")
                .with_message("recipient_ids must not be empty".into()))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_audience"))]
pub struct CreateAnnouncementDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub recipient_ids: Vec<UserId>,
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub priority: AnnouncementPriority,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAnnouncementDto {
    #[validate(length(min = 1, max = 200, message = "title must have between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: Option<String>,
    pub priority: Option<AnnouncementPriority>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnnouncementFilterParams {
    pub kind: Option<AnnouncementKind>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    #[param(value_type = Option<String>, format = Uuid)]
    pub class_id: Option<Uuid>,
    pub priority: Option<AnnouncementPriority>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(kind: AnnouncementKind) -> CreateAnnouncementDto {
        CreateAnnouncementDto {
            title: "Reunião de pais".to_string(),
            content: "Sexta-feira às 19h".to_string(),
            kind,
            recipient_ids: vec![],
            class_id: None,
            priority: AnnouncementPriority::default(),
            expires_at: None,
        }
    }

    #[test]
    fn test_general_needs_no_audience() {
        assert!(dto(AnnouncementKind::General).validate().is_ok());
    }

    #[test]
    fn test_class_requires_class_id() {
        let mut d = dto(AnnouncementKind::Class);
        assert!(d.validate().is_err());
        d.class_id = Some(ClassId::new());
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_student_requires_recipients() {
        let mut d = dto(AnnouncementKind::Student);
        assert!(d.validate().is_err());
        d.recipient_ids = vec![UserId::new()];
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let d: CreateAnnouncementDto =
            serde_json::from_str(r#"{"title":"t","content":"c","kind":"general"}"#).unwrap();
        assert_eq!(d.priority, AnnouncementPriority::Medium);
    }
}
