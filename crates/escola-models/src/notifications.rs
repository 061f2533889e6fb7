//! In-app notifications and registered push device tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use validator::Validate;

use crate::ids::{DeviceTokenId, NotificationId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    GradePosted,
    LowAverage,
    LowAttendance,
    Event,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::GradePosted => "grade_posted",
            NotificationKind::LowAverage => "low_average",
            NotificationKind::LowAttendance => "low_attendance",
            NotificationKind::Event => "event",
            NotificationKind::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    /// Free-form payload, e.g. `{"subject": "Math", "average": "5.5"}`
    #[schema(value_type = Object)]
    pub data: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DeviceToken {
    pub id: DeviceTokenId,
    pub user_id: UserId,
    pub token: String,
    pub device: String,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterDeviceTokenDto {
    /// FCM registration token
    #[validate(length(min = 100, max = 4096, message = "token must be a valid FCM registration token"))]
    pub token: String,
    #[validate(length(min = 1, max = 100, message = "device is required"))]
    pub device: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_token_rejected() {
        let dto = RegisterDeviceTokenDto {
            token: "abc".to_string(),
            device: "android".to_string(),
        };
        assert!(dto.validate().is_err());

        let dto = RegisterDeviceTokenDto {
            token: "x".repeat(152),
            device: "android".to_string(),
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_kind_names_match_serde() {
        for kind in [
            NotificationKind::GradePosted,
            NotificationKind::LowAverage,
            NotificationKind::LowAttendance,
            NotificationKind::Event,
            NotificationKind::General,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
