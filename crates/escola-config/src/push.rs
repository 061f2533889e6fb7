use std::env;

/// Firebase service-account credentials for push delivery.
///
/// All three variables must be set; otherwise push is disabled and
/// notifications are only stored.
#[derive(Clone)]
pub struct PushConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl PushConfig {
    pub fn from_env() -> Option<Self> {
        let project_id = non_empty("FIREBASE_PROJECT_ID")?;
        let client_email = non_empty("FIREBASE_CLIENT_EMAIL")?;
        let private_key = non_empty("FIREBASE_PRIVATE_KEY")?;

        Some(Self {
            project_id,
            client_email,
            private_key: unescape_newlines(&private_key),
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Keys pasted into `.env` files usually carry literal `\n` sequences.
fn unescape_newlines(key: &str) -> String {
    key.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_newlines() {
        assert_eq!(
            unescape_newlines("-----BEGIN-----\\nabc\\n-----END-----"),
            "-----BEGIN-----\nabc\n-----END-----"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = PushConfig {
            project_id: "escola".to_string(),
            client_email: "svc@escola.iam".to_string(),
            private_key: "secret".to_string(),
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret"));
    }
}
