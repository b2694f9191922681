//! Backend REST surface.
//!
//! `FileStackerBackend` is the seam every client component talks through.
//! `HttpBackend` implements it over `reqwest`; tests substitute scripted
//! fakes.

mod http;

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::models::{
    FileId, RawFileRecord, Session, SettingsUpdate, StorageStats, UserSettings,
};
use crate::{Error, Result};

pub use http::HttpBackend;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Operations the FileStacker backend exposes to clients.
#[allow(async_fn_in_trait)]
pub trait FileStackerBackend {
    /// `POST /api/auth/login`
    async fn login(&self, credentials: &Credentials) -> Result<Session>;

    /// `POST /api/auth/register`
    async fn register(&self, registration: &Registration) -> Result<Session>;

    /// `POST /api/auth/logout`
    async fn logout(&self) -> Result<()>;

    /// `GET /api/auth/me`
    async fn who_am_i(&self) -> Result<Session>;

    /// `GET /api/files`, optionally filtered by a search term
    async fn list_files(&self, search: Option<&str>) -> Result<Vec<RawFileRecord>>;

    /// `GET /api/files/{id}`
    async fn get_file(&self, id: &FileId) -> Result<RawFileRecord>;

    /// `POST /api/files/upload` as multipart with field `file`
    async fn upload_file(&self, file: &LocalFile) -> Result<RawFileRecord>;

    /// `GET /api/files/{id}/download`, returning a short-lived signed URL
    async fn download_handle(&self, id: &FileId) -> Result<SignedHandle>;

    /// Fetch the object behind a signed handle
    async fn fetch_signed(&self, handle: &SignedHandle) -> Result<Vec<u8>>;

    /// `DELETE /api/files/{id}`
    async fn delete_file(&self, id: &FileId) -> Result<()>;

    /// `PATCH /api/files/{id}/tags?filename=`
    async fn rename_file(&self, id: &FileId, filename: &str) -> Result<RawFileRecord>;

    /// `GET /api/stats`
    async fn stats(&self) -> Result<StorageStats>;

    /// `GET /api/settings?user_id=`
    async fn settings(&self, user_id: &str) -> Result<UserSettings>;

    /// `PUT /api/settings?user_id=`
    async fn update_settings(&self, user_id: &str, update: &SettingsUpdate)
        -> Result<UserSettings>;

    /// Opaque credential material (cookie header) to persist with a session.
    fn credential_snapshot(&self) -> Option<String> {
        None
    }

    /// Re-install credential material captured by `credential_snapshot`.
    fn restore_credentials(&self, _credentials: &str) {}

    /// Drop any credential material held by the client.
    fn clear_credentials(&self) {}
}

/// Login form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let email = email.into().trim().to_string();
        let password = password.into();
        if email.is_empty() {
            return Err(Error::InvalidInput("Email is required".to_string()));
        }
        if password.trim().is_empty() {
            return Err(Error::InvalidInput("Password is required".to_string()));
        }
        Ok(Self { email, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub user_name: String,
    pub org_name: String,
}

impl Registration {
    pub fn new(
        credentials: Credentials,
        user_name: impl Into<String>,
        org_name: impl Into<String>,
    ) -> Result<Self> {
        let user_name = user_name.into().trim().to_string();
        let org_name = org_name.into().trim().to_string();
        if user_name.is_empty() {
            return Err(Error::InvalidInput("Name is required".to_string()));
        }
        if org_name.is_empty() {
            return Err(Error::InvalidInput("Organization is required".to_string()));
        }
        Ok(Self {
            credentials,
            user_name,
            org_name,
        })
    }
}

/// A local file staged for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| guess_content_type(&name));
        Self {
            name,
            content_type,
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| {
                Error::InvalidInput(format!("{} has no usable file name", path.display()))
            })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(name, None, bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first()
        .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), |mime| mime.to_string())
}

/// A short-lived, backend-issued retrieval URL.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedHandle {
    pub url: String,
    pub filename: Option<String>,
}

impl fmt::Debug for SignedHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = self
            .url
            .split_once('?')
            .map_or(self.url.as_str(), |(path, _)| path);
        formatter
            .debug_struct("SignedHandle")
            .field("url", &format_args!("{redacted}?[REDACTED]"))
            .field("filename", &self.filename)
            .finish()
    }
}

/// Extract a human-readable message from an error response body.
///
/// Fallback chain: a string `detail`/`message`/`error` field, then the
/// joined `.msg` fields of an array `detail`, then the raw body text, then
/// `Request failed: {status}`.
pub fn parse_api_error(status: u16, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<Value>(body) {
        if let Some(message) = message_from_payload(&payload) {
            return message;
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Request failed: {status}")
    } else {
        trimmed.to_string()
    }
}

fn message_from_payload(payload: &Value) -> Option<String> {
    if let Value::String(text) = payload {
        return non_empty(text);
    }

    for key in ["detail", "message", "error"] {
        if let Some(Value::String(text)) = payload.get(key) {
            if let Some(message) = non_empty(text) {
                return Some(message);
            }
        }
    }

    for key in ["detail", "errors"] {
        if let Some(Value::Array(items)) = payload.get(key) {
            let messages = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .filter_map(non_empty)
                .collect::<Vec<_>>();
            if !messages.is_empty() {
                return Some(messages.join("; "));
            }
        }
    }

    None
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Interpret an auth endpoint payload: `{"user": {...}}` or a flat session.
///
/// Some backends answer failed logins with a 2xx `{"error": "..."}`; that is
/// surfaced as an API error carrying the response status.
pub fn session_from_payload(status: u16, payload: Value) -> Result<Session> {
    if let Some(user) = payload.get("user").filter(|user| user.is_object()) {
        return Ok(serde_json::from_value(user.clone())?);
    }
    if payload.get("user_id").is_some() {
        return Ok(serde_json::from_value(payload)?);
    }
    if let Some(message) = message_from_payload(&payload) {
        let status = if (200..300).contains(&status) { 401 } else { status };
        return Err(Error::Api { status, message });
    }
    Err(Error::InvalidResponse(
        "auth response did not include a user".to_string(),
    ))
}
