//! Push delivery through Firebase Cloud Messaging (HTTP v1 API).
//!
//! The provider is built once at startup from [`PushConfig`] and owned by the
//! notification worker. Without credentials the worker falls back to
//! [`LogPushProvider`] and notifications are only stored.

use async_trait::async_trait;
use chrono::Utc;
use escola_config::PushConfig;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::dispatcher::NotificationError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Access tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// One message addressed to one device.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    /// FCM only accepts string values in `data`
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(token: impl Into<String>, title: &str, body: &str, data: &Value) -> Self {
        Self {
            token: token.into(),
            title: title.to_string(),
            body: body.to_string(),
            data: stringify_data(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    /// The device token is unregistered or malformed and should be forgotten
    InvalidToken,
    /// Push is disabled; nothing left the server
    Skipped,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<PushOutcome, NotificationError>;

    fn name(&self) -> &'static str;
}

/// Provider used when no push credentials are configured.
#[derive(Debug, Default)]
pub struct LogPushProvider;

#[async_trait]
impl PushProvider for LogPushProvider {
    async fn send(&self, message: &PushMessage) -> Result<PushOutcome, NotificationError> {
        debug!(title = %message.title, "push disabled, notification stored only");
        Ok(PushOutcome::Skipped)
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct FcmPushProvider {
    client: reqwest::Client,
    config: PushConfig,
    key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl FcmPushProvider {
    pub fn new(config: PushConfig) -> Result<Self, NotificationError> {
        let key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())
            .map_err(|e| NotificationError::Auth(format!("invalid service account key: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            config,
            key,
            token: Mutex::new(None),
        })
    }

    fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.config.project_id
        )
    }

    fn sign_assertion(&self, now: i64) -> Result<String, NotificationError> {
        let claims = AssertionClaims {
            iss: &self.config.client_email,
            scope: MESSAGING_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| NotificationError::Auth(format!("failed to sign assertion: {}", e)))
    }

    async fn access_token(&self) -> Result<String, NotificationError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_REFRESH_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.sign_assertion(now)?;
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Auth(format!(
                "token exchange failed with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl PushProvider for FcmPushProvider {
    #[instrument(skip(self, message), fields(title = %message.title))]
    async fn send(&self, message: &PushMessage) -> Result<PushOutcome, NotificationError> {
        let access_token = self.access_token().await?;

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(access_token)
            .json(&fcm_body(message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Delivered);
        }

        let body = response.text().await.unwrap_or_default();
        if is_invalid_token_error(status.as_u16(), &body) {
            return Ok(PushOutcome::InvalidToken);
        }

        Err(NotificationError::Provider {
            status: status.as_u16(),
            message: body,
        })
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

fn fcm_body(message: &PushMessage) -> Value {
    json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "data": message.data,
        }
    })
}

/// FCM reports dead tokens as `UNREGISTERED` (404) and malformed ones as
/// `INVALID_ARGUMENT` (400).
fn is_invalid_token_error(status: u16, body: &str) -> bool {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return false,
    };
    let error = &parsed["error"];

    let status_name = error["status"].as_str().unwrap_or_default();
    let detail_codes = error["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["errorCode"].as_str())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    match status {
        404 => status_name == "NOT_FOUND" || detail_codes.contains(&"UNREGISTERED"),
        400 => status_name == "INVALID_ARGUMENT" || detail_codes.contains(&"INVALID_ARGUMENT"),
        _ => detail_codes.contains(&"UNREGISTERED"),
    }
}

fn stringify_data(data: &Value) -> BTreeMap<String, String> {
    let empty = Map::new();
    data.as_object()
        .unwrap_or(&empty)
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_values_become_strings() {
        let data = json!({"subject": "Matemática", "value": 7.5, "bimester": 2, "missing": null});
        let message = PushMessage::new("tok", "Nova nota", "corpo", &data);

        assert_eq!(message.data["subject"], "Matemática");
        assert_eq!(message.data["value"], "7.5");
        assert_eq!(message.data["bimester"], "2");
        assert!(!message.data.contains_key("missing"));
    }

    #[test]
    fn test_non_object_data_is_empty() {
        let message = PushMessage::new("tok", "t", "b", &json!("plain"));
        assert!(message.data.is_empty());
    }

    #[test]
    fn test_fcm_body_shape() {
        let message = PushMessage::new("device-token", "Título", "Mensagem", &json!({"k": "v"}));
        let body = fcm_body(&message);
        assert_eq!(body["message"]["token"], "device-token");
        assert_eq!(body["message"]["notification"]["title"], "Título");
        assert_eq!(body["message"]["data"]["k"], "v");
    }

    #[test]
    fn test_unregistered_token_is_detected() {
        let body = r#"{"error":{"code":404,"status":"NOT_FOUND","details":[{"@type":"type.googleapis.com/google.firebase.fcm.v1.FcmError","errorCode":"UNREGISTERED"}]}}"#;
        assert!(is_invalid_token_error(404, body));
    }

    #[test]
    fn test_invalid_argument_is_detected() {
        let body = r#"{"error":{"code":400,"status":"INVALID_ARGUMENT","message":"The registration token is not a valid FCM registration token"}}"#;
        assert!(is_invalid_token_error(400, body));
    }

    #[test]
    fn test_server_errors_are_not_token_errors() {
        let body = r#"{"error":{"code":503,"status":"UNAVAILABLE"}}"#;
        assert!(!is_invalid_token_error(503, body));
        assert!(!is_invalid_token_error(500, "<html>oops</html>"));
    }

    #[test]
    fn test_bad_private_key_is_rejected() {
        let config = PushConfig {
            project_id: "escola".to_string(),
            client_email: "svc@escola.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
        };
        assert!(matches!(
            FcmPushProvider::new(config),
            Err(NotificationError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_log_provider_skips_delivery() {
        let provider = LogPushProvider;
        let message = PushMessage::new("tok", "t", "b", &json!({}));
        assert_eq!(provider.send(&message).await.unwrap(), PushOutcome::Skipped);
        assert_eq!(provider.name(), "log");
    }
}
