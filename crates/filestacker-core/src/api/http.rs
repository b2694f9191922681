//! `reqwest` implementation of the backend REST surface.
//!
//! Requests carry the session cookie through a shared cookie jar, the same
//! way a browser sends credentials with every call.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{
    parse_api_error, session_from_payload, Credentials, FileStackerBackend, LocalFile,
    Registration, SignedHandle,
};
use crate::config::ClientConfig;
use crate::models::{
    FileId, RawFileRecord, Session, SettingsUpdate, StorageStats, ThemeMode, UserSettings,
};
use crate::util::{compact_text, is_http_url};
use crate::{Error, Result};

/// HTTP client for the FileStacker REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    origin: Url,
    client: Client,
    jar: Arc<Jar>,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let origin = Url::parse(&config.api_base_url)
            .map_err(|error| Error::Config(format!("Invalid API base URL: {error}")))?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(config.request_timeout)
            .read_timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Config(format!("Failed to construct HTTP client: {error}")))?;

        Ok(Self {
            base_url: config.api_base_url.clone(),
            origin,
            client,
            jar,
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_url(&self, id: &FileId, suffix: &str) -> String {
        self.url(&format!(
            "/api/files/{}{suffix}",
            urlencoding::encode(id.as_str())
        ))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("Accept", "application/json")
    }

    /// Send a short API call bounded by the total request timeout.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.send_unbounded(request.timeout(self.request_timeout))
            .await
    }

    /// Send without a total deadline. Stalled transfers still fail on the
    /// client's connect and read timeouts.
    async fn send_unbounded(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build()?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        tracing::debug!(%method, %path, "Sending backend request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = parse_api_error(status.as_u16(), &body);
        tracing::debug!(
            %method,
            %path,
            status = status.as_u16(),
            body = %compact_text(&body),
            "Backend request failed"
        );
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        parse_json(response).await
    }

    async fn send_auth(&self, request: RequestBuilder) -> Result<Session> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let payload = response.json::<Value>().await?;
        session_from_payload(status, payload)
    }

    fn resolve_signed_url(&self, candidate: &str) -> Option<String> {
        let candidate = candidate.trim();
        if is_http_url(candidate) {
            Some(candidate.to_string())
        } else if candidate.starts_with('/') {
            Some(self.url(candidate))
        } else {
            None
        }
    }
}

impl FileStackerBackend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.send_auth(self.request(Method::POST, "/api/auth/login").json(credentials))
            .await
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        self.send_auth(
            self.request(Method::POST, "/api/auth/register")
                .json(registration),
        )
        .await
    }

    async fn logout(&self) -> Result<()> {
        self.send(self.request(Method::POST, "/api/auth/logout"))
            .await?;
        Ok(())
    }

    async fn who_am_i(&self) -> Result<Session> {
        self.send_auth(self.request(Method::GET, "/api/auth/me"))
            .await
    }

    async fn list_files(&self, search: Option<&str>) -> Result<Vec<RawFileRecord>> {
        let mut request = self.request(Method::GET, "/api/files");
        if let Some(search) = search.map(str::trim).filter(|value| !value.is_empty()) {
            request = request.query(&[("search", search)]);
        }
        let payload = self.send_json::<Value>(request).await?;
        records_from_payload(payload)
    }

    async fn get_file(&self, id: &FileId) -> Result<RawFileRecord> {
        let request = self
            .client
            .get(self.file_url(id, ""))
            .header("Accept", "application/json");
        let payload = self.send_json::<Value>(request).await?;
        record_from_payload(payload)
    }

    async fn upload_file(&self, file: &LocalFile) -> Result<RawFileRecord> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|error| {
                Error::InvalidInput(format!(
                    "Invalid content type '{}': {error}",
                    file.content_type
                ))
            })?;
        let form = Form::new().part("file", part);
        let response = self
            .send_unbounded(
                self.request(Method::POST, "/api/files/upload")
                    .multipart(form),
            )
            .await?;
        record_from_payload(parse_json(response).await?)
    }

    async fn download_handle(&self, id: &FileId) -> Result<SignedHandle> {
        let request = self
            .client
            .get(self.file_url(id, "/download"))
            .header("Accept", "application/json");
        let payload = self.send_json::<DownloadResponse>(request).await?;
        let url = [
            payload.url,
            payload.signed_url,
            payload.download_url,
            payload.path,
        ]
        .into_iter()
        .flatten()
        .find_map(|candidate| self.resolve_signed_url(&candidate))
        .ok_or_else(|| {
            Error::InvalidResponse("download response did not include a signed URL".to_string())
        })?;

        Ok(SignedHandle {
            url,
            filename: payload.filename,
        })
    }

    async fn fetch_signed(&self, handle: &SignedHandle) -> Result<Vec<u8>> {
        let response = self.send_unbounded(self.client.get(&handle.url)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn delete_file(&self, id: &FileId) -> Result<()> {
        self.send(self.client.delete(self.file_url(id, ""))).await?;
        Ok(())
    }

    async fn rename_file(&self, id: &FileId, filename: &str) -> Result<RawFileRecord> {
        let request = self
            .client
            .patch(self.file_url(id, "/tags"))
            .header("Accept", "application/json")
            .query(&[("filename", filename)]);
        let payload = self.send_json::<Value>(request).await?;
        record_from_payload(payload)
    }

    async fn stats(&self) -> Result<StorageStats> {
        self.send_json(self.request(Method::GET, "/api/stats"))
            .await
    }

    async fn settings(&self, user_id: &str) -> Result<UserSettings> {
        self.send_json(
            self.request(Method::GET, "/api/settings")
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        let mut query = vec![("user_id", user_id.to_string())];
        if let Some(theme) = update.theme {
            query.push(("theme", theme.as_str().to_string()));
        }
        if let Some(notifications) = update.notifications {
            query.push(("notifications", notifications.to_string()));
        }

        let payload = self
            .send_json::<SettingsResponse>(self.request(Method::PUT, "/api/settings").query(&query))
            .await?;
        let defaults = UserSettings::default();
        Ok(UserSettings {
            theme: payload.theme.or(update.theme).unwrap_or(defaults.theme),
            notifications: payload
                .notifications
                .or(update.notifications)
                .unwrap_or(defaults.notifications),
        })
    }

    fn credential_snapshot(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|header| header.to_str().ok().map(ToOwned::to_owned))
            .filter(|cookies| !cookies.trim().is_empty())
    }

    fn restore_credentials(&self, credentials: &str) {
        for cookie in credentials
            .split(';')
            .map(str::trim)
            .filter(|cookie| !cookie.is_empty())
        {
            self.jar.add_cookie_str(cookie, &self.origin);
        }
    }

    fn clear_credentials(&self) {
        let Some(cookies) = self.credential_snapshot() else {
            return;
        };
        for name in cookies
            .split(';')
            .filter_map(|cookie| cookie.split_once('=').map(|(name, _)| name.trim()))
        {
            self.jar
                .add_cookie_str(&format!("{name}=; Max-Age=0"), &self.origin);
        }
    }
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "signedUrl")]
    signed_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    #[serde(default)]
    theme: Option<ThemeMode>,
    #[serde(default)]
    notifications: Option<bool>,
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|error| Error::InvalidResponse(format!("{error}: {}", compact_text(&body))))
}

/// Accepts a bare array, `{"files": [...]}`, or the legacy "No files found"
/// string some backends return for an empty catalog.
fn records_from_payload(payload: Value) -> Result<Vec<RawFileRecord>> {
    match payload {
        Value::Array(_) => Ok(serde_json::from_value(payload)?),
        Value::String(_) | Value::Null => Ok(Vec::new()),
        Value::Object(mut object) => match object.remove("files") {
            Some(files) => Ok(serde_json::from_value(files)?),
            None => Err(Error::InvalidResponse(
                "file list response was not an array".to_string(),
            )),
        },
        _ => Err(Error::InvalidResponse(
            "file list response was not an array".to_string(),
        )),
    }
}

/// Accepts a bare record or a `{"file": {...}}` envelope.
fn record_from_payload(payload: Value) -> Result<RawFileRecord> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        return Err(Error::Api {
            status: 404,
            message: error.to_string(),
        });
    }
    match payload.get("file") {
        Some(file) if file.is_object() => Ok(serde_json::from_value(file.clone())?),
        _ => Ok(serde_json::from_value(payload)?),
    }
}
