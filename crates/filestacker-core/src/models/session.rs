//! Session identity model

use serde::{Deserialize, Serialize};

/// Identity of the signed-in account, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default, alias = "user_email", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    /// Short label for status lines: the email when known, else the user name.
    pub fn display_label(&self) -> &str {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ if !self.user_name.is_empty() => &self.user_name,
            _ => &self.user_id,
        }
    }
}

/// Session identity plus the credentials needed to resume it in a new process.
///
/// `cookies` holds the cookie header captured from the HTTP client after
/// login. It is an opaque secret and is redacted from debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub session: Session,
    #[serde(default)]
    pub cookies: Option<String>,
    pub saved_at: i64,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("StoredSession")
            .field("session", &self.session)
            .field("cookies", &self.cookies.as_ref().map(|_| "[REDACTED]"))
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_accepts_user_email_alias() {
        let session: Session = serde_json::from_str(
            r#"{"user_id":"u1","user_name":"Ada","org_id":"o1","org_name":"Acme","user_email":"ada@acme.io"}"#,
        )
        .unwrap();
        assert_eq!(session.email.as_deref(), Some("ada@acme.io"));
        assert_eq!(session.display_label(), "ada@acme.io");
    }

    #[test]
    fn stored_session_debug_redacts_cookies() {
        let stored = StoredSession {
            session: Session {
                user_id: "u1".to_string(),
                user_name: "Ada".to_string(),
                org_id: String::new(),
                org_name: String::new(),
                email: None,
            },
            cookies: Some("session=secret-cookie".to_string()),
            saved_at: 0,
        };
        let rendered = format!("{stored:?}");
        assert!(!rendered.contains("secret-cookie"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
