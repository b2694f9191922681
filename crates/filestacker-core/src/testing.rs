//! Scripted in-memory backend shared by the component tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::api::{Credentials, FileStackerBackend, LocalFile, Registration, SignedHandle};
use crate::models::{
    FileId, RawFileRecord, Session, SettingsUpdate, StorageStats, UserSettings,
};
use crate::{Error, Result};

pub fn api_error(status: u16, message: &str) -> Error {
    Error::Api {
        status,
        message: message.to_string(),
    }
}

pub fn raw_record(id: &str, filename: &str) -> RawFileRecord {
    serde_json::from_value(serde_json::json!({
        "file_id": id,
        "filename": filename,
        "file_type": "application/pdf",
        "file_size": 1024,
        "uploaded_at": "2024-06-15T10:30:00",
        "owner_name": "Ada",
        "storage_path": format!("org/{id}/{filename}"),
    }))
    .expect("valid raw record")
}

pub fn session() -> Session {
    Session {
        user_id: "u1".to_string(),
        user_name: "Ada".to_string(),
        org_id: "o1".to_string(),
        org_name: "Acme".to_string(),
        email: Some("ada@acme.io".to_string()),
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub calls: Vec<String>,
    pub files: Vec<RawFileRecord>,
    pub list_failure: Option<(u16, String)>,
    pub list_delay: Option<Duration>,
    pub action_delay: Option<Duration>,
    pub failing_uploads: HashSet<String>,
    pub delete_failure: Option<(u16, String)>,
    pub delete_keeps_record: bool,
    pub download_failure: Option<(u16, String)>,
    pub session: Option<Session>,
    pub login_failure: Option<(u16, String)>,
    pub who_am_i_failure: Option<(u16, String)>,
    pub logout_failure: Option<(u16, String)>,
    pub cookies: Option<String>,
    pub restored_credentials: Option<String>,
    pub settings: UserSettings,
    pub next_id: u32,
}

/// Backend double that records every call and answers from `FakeState`.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn with_files(files: Vec<RawFileRecord>) -> Self {
        let backend = Self::default();
        backend.state().files = files;
        backend
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    async fn action_pause(&self) {
        let delay = self.state().action_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn scripted(failure: Option<&(u16, String)>) -> Result<()> {
        match failure {
            Some((status, message)) => Err(api_error(*status, message)),
            None => Ok(()),
        }
    }
}

impl FileStackerBackend for FakeBackend {
    async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.record(format!("login {}", credentials.email));
        let mut state = self.state();
        Self::scripted(state.login_failure.as_ref())?;
        let mut session = session();
        session.email = Some(credentials.email.clone());
        state.session = Some(session.clone());
        state.cookies = Some("fs_session=token-1".to_string());
        Ok(session)
    }

    async fn register(&self, registration: &Registration) -> Result<Session> {
        self.record(format!("register {}", registration.credentials.email));
        let mut state = self.state();
        Self::scripted(state.login_failure.as_ref())?;
        let session = Session {
            user_name: registration.user_name.clone(),
            org_name: registration.org_name.clone(),
            email: Some(registration.credentials.email.clone()),
            ..session()
        };
        state.session = Some(session.clone());
        state.cookies = Some("fs_session=token-2".to_string());
        Ok(session)
    }

    async fn logout(&self) -> Result<()> {
        self.record("logout".to_string());
        let mut state = self.state();
        state.session = None;
        state.cookies = None;
        Self::scripted(state.logout_failure.as_ref())
    }

    async fn who_am_i(&self) -> Result<Session> {
        self.record("me".to_string());
        let state = self.state();
        Self::scripted(state.who_am_i_failure.as_ref())?;
        state
            .session
            .clone()
            .ok_or_else(|| api_error(401, "Not authenticated"))
    }

    async fn list_files(&self, search: Option<&str>) -> Result<Vec<RawFileRecord>> {
        self.record(format!("list {}", search.unwrap_or_default()).trim_end().to_string());
        let delay = self.state().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state();
        Self::scripted(state.list_failure.as_ref())?;
        let files = state
            .files
            .iter()
            .filter(|file| search.map_or(true, |term| file.filename.contains(term)))
            .cloned()
            .collect();
        Ok(files)
    }

    async fn get_file(&self, id: &FileId) -> Result<RawFileRecord> {
        self.record(format!("get {id}"));
        self.state()
            .files
            .iter()
            .find(|file| file.file_id == id.as_str())
            .cloned()
            .ok_or_else(|| api_error(404, "File not found"))
    }

    async fn upload_file(&self, file: &LocalFile) -> Result<RawFileRecord> {
        self.record(format!("upload {}", file.name));
        let mut state = self.state();
        if state.failing_uploads.contains(&file.name) {
            return Err(api_error(500, "Internal Server Error"));
        }
        state.next_id += 1;
        let record = raw_record(&format!("up{}", state.next_id), &file.name);
        state.files.push(record.clone());
        Ok(record)
    }

    async fn download_handle(&self, id: &FileId) -> Result<SignedHandle> {
        self.record(format!("download {id}"));
        self.action_pause().await;
        let state = self.state();
        Self::scripted(state.download_failure.as_ref())?;
        let file = state
            .files
            .iter()
            .find(|file| file.file_id == id.as_str())
            .ok_or_else(|| api_error(404, "File not found"))?;
        Ok(SignedHandle {
            url: format!("https://cdn.test/{id}?token=signed"),
            filename: Some(file.filename.clone()),
        })
    }

    async fn fetch_signed(&self, handle: &SignedHandle) -> Result<Vec<u8>> {
        self.record(format!("fetch {}", handle.url));
        Ok(format!("contents of {}", handle.filename.as_deref().unwrap_or("?")).into_bytes())
    }

    async fn delete_file(&self, id: &FileId) -> Result<()> {
        self.record(format!("delete {id}"));
        self.action_pause().await;
        let mut state = self.state();
        Self::scripted(state.delete_failure.as_ref())?;
        if !state.delete_keeps_record {
            state.files.retain(|file| file.file_id != id.as_str());
        }
        Ok(())
    }

    async fn rename_file(&self, id: &FileId, filename: &str) -> Result<RawFileRecord> {
        self.record(format!("rename {id} {filename}"));
        let mut state = self.state();
        let file = state
            .files
            .iter_mut()
            .find(|file| file.file_id == id.as_str())
            .ok_or_else(|| api_error(404, "File not found"))?;
        file.filename = filename.to_string();
        Ok(file.clone())
    }

    async fn stats(&self) -> Result<StorageStats> {
        self.record("stats".to_string());
        let state = self.state();
        Ok(StorageStats {
            total_files: state.files.len() as u64,
            storage_used: 1.0,
            storage_unit: "KB".to_string(),
        })
    }

    async fn settings(&self, user_id: &str) -> Result<UserSettings> {
        self.record(format!("settings {user_id}"));
        Ok(self.state().settings.clone())
    }

    async fn update_settings(
        &self,
        user_id: &str,
        update: &SettingsUpdate,
    ) -> Result<UserSettings> {
        self.record(format!("update_settings {user_id}"));
        let mut state = self.state();
        if let Some(theme) = update.theme {
            state.settings.theme = theme;
        }
        if let Some(notifications) = update.notifications {
            state.settings.notifications = notifications;
        }
        Ok(state.settings.clone())
    }

    fn credential_snapshot(&self) -> Option<String> {
        self.state().cookies.clone()
    }

    fn restore_credentials(&self, credentials: &str) {
        self.state().restored_credentials = Some(credentials.to_string());
    }

    fn clear_credentials(&self) {
        self.state().cookies = None;
    }
}
