//! Per-file actions: open, download, delete, rename, details.
//!
//! Each file runs at most one action at a time. Its phase moves
//! `idle -> requesting -> opened | downloaded | deleted | failed -> idle`;
//! starting a second action while one is requesting is rejected with
//! `Error::ActionInProgress`. Nothing is retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::FileStackerBackend;
use crate::catalog::CatalogClient;
use crate::models::{FileId, FileRecord};
use crate::notifications::NotificationCenter;
use crate::{Error, Result};

/// Hands a signed URL to whatever can display it.
pub trait Launcher {
    fn launch(&self, url: &str) -> Result<()>;
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Open,
    Download,
    Delete,
    Rename,
}

impl ActionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::Rename => "rename",
        }
    }

    const fn finished(self) -> ActionPhase {
        match self {
            Self::Open => ActionPhase::Opened,
            Self::Download => ActionPhase::Downloaded,
            Self::Delete => ActionPhase::Deleted,
            Self::Rename => ActionPhase::Renamed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Idle,
    Requesting(ActionKind),
    Opened,
    Downloaded,
    Deleted,
    Renamed,
    Failed,
}

impl ActionPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting(_) => "requesting",
            Self::Opened => "opened",
            Self::Downloaded => "downloaded",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Failed => "failed",
        }
    }
}

type ActiveActions = Mutex<HashMap<FileId, ActionKind>>;

pub struct FileActionDispatcher<B> {
    backend: Arc<B>,
    catalog: Arc<CatalogClient<B>>,
    notifications: Arc<NotificationCenter>,
    active: ActiveActions,
}

impl<B: FileStackerBackend> FileActionDispatcher<B> {
    pub fn new(
        backend: Arc<B>,
        catalog: Arc<CatalogClient<B>>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        Self {
            backend,
            catalog,
            notifications,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Current phase of a file. Terminal phases are transient, so a file is
    /// either idle or requesting when observed from outside.
    pub fn phase(&self, id: &FileId) -> ActionPhase {
        lock(&self.active)
            .get(id)
            .map_or(ActionPhase::Idle, |kind| ActionPhase::Requesting(*kind))
    }

    /// Request a signed URL and hand it to `launcher`.
    pub async fn open(&self, id: &FileId, launcher: &impl Launcher) -> Result<()> {
        let slot = self.begin(id, ActionKind::Open)?;
        let result: Result<()> = async {
            let handle = self.backend.download_handle(id).await?;
            launcher.launch(&handle.url)
        }
        .await;
        self.settle(slot, result)
    }

    /// Fetch a file through its signed URL and write it into `destination`
    /// under the record's filename. Returns the written path.
    pub async fn download(&self, id: &FileId, destination: &Path) -> Result<PathBuf> {
        let slot = self.begin(id, ActionKind::Download)?;
        let result: Result<PathBuf> = async {
            let record = self.record(id).await?;
            if record.storage_path.is_none() {
                return Err(Error::InvalidInput(format!(
                    "{} has no stored content to download",
                    record.filename
                )));
            }

            let handle = self.backend.download_handle(id).await?;
            let bytes = self.backend.fetch_signed(&handle).await?;
            let filename = safe_filename(handle.filename.as_deref().unwrap_or(&record.filename))
                .unwrap_or_else(|| id.to_string());

            tokio::fs::create_dir_all(destination).await?;
            let path = destination.join(filename);
            tokio::fs::write(&path, &bytes).await?;
            tracing::info!(file_id = %id, path = %path.display(), bytes = bytes.len(), "Downloaded file");
            Ok(path)
        }
        .await;
        self.settle(slot, result)
    }

    /// Delete a file after confirmation. Returns `false` when declined.
    ///
    /// The file disappears from the catalog immediately. If the backend
    /// rejects the deletion, an error notification is pushed and the next
    /// successful refresh shows the file again.
    pub async fn delete(&self, id: &FileId, confirm: &impl Confirm) -> Result<bool> {
        let slot = self.begin(id, ActionKind::Delete)?;
        if !confirm.confirm(&format!("Delete {}?", slot.name)) {
            tracing::debug!(file_id = %id, "Delete cancelled");
            return Ok(false);
        }

        self.catalog.begin_removal(id);
        let result = self.backend.delete_file(id).await;
        self.catalog.finish_removal(id, result.is_ok());
        if result.is_ok() {
            self.notifications.success(format!("Deleted {}", slot.name));
        }
        self.settle(slot, result).map(|()| true)
    }

    /// Rename a file, then refresh the catalog silently.
    pub async fn rename(&self, id: &FileId, filename: &str) -> Result<FileRecord> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(Error::InvalidInput("Filename must not be empty".to_string()));
        }

        let slot = self.begin(id, ActionKind::Rename)?;
        let result = self
            .backend
            .rename_file(id, filename)
            .await
            .map(FileRecord::from_raw);
        let record = self.settle(slot, result)?;

        if let Err(error) = self.catalog.refresh_after_change(true).await {
            tracing::warn!("Refresh after rename failed: {}", error);
        }
        Ok(record)
    }

    /// Fetch one file record from the backend.
    pub async fn details(&self, id: &FileId) -> Result<FileRecord> {
        self.backend.get_file(id).await.map(FileRecord::from_raw)
    }

    fn begin(&self, id: &FileId, kind: ActionKind) -> Result<ActionSlot<'_>> {
        let mut active = lock(&self.active);
        if let Some(running) = active.get(id) {
            tracing::debug!(
                file_id = %id,
                running = running.as_str(),
                requested = kind.as_str(),
                "Rejecting concurrent file action"
            );
            return Err(Error::ActionInProgress(id.to_string()));
        }
        active.insert(id.clone(), kind);
        drop(active);
        tracing::debug!(file_id = %id, action = kind.as_str(), "File action requesting");
        Ok(ActionSlot {
            active: &self.active,
            id: id.clone(),
            name: self.display_name(id),
            kind,
        })
    }

    /// Log the terminal phase, notify on failure, and return to idle.
    fn settle<T>(&self, slot: ActionSlot<'_>, result: Result<T>) -> Result<T> {
        let phase = if result.is_ok() {
            slot.kind.finished()
        } else {
            ActionPhase::Failed
        };
        tracing::debug!(file_id = %slot.id, phase = phase.as_str(), "File action finished");

        if let Err(error) = &result {
            self.notifications.error(format!(
                "Failed to {} {}: {error}",
                slot.kind.as_str(),
                slot.name
            ));
        }
        drop(slot);
        result
    }

    async fn record(&self, id: &FileId) -> Result<FileRecord> {
        match self.catalog.find(id) {
            Some(record) => Ok(record),
            None => self.details(id).await,
        }
    }

    fn display_name(&self, id: &FileId) -> String {
        self.catalog
            .find(id)
            .map_or_else(|| id.to_string(), |record| record.filename)
    }
}

/// Holds a file's requesting slot; dropping it returns the file to idle.
struct ActionSlot<'a> {
    active: &'a ActiveActions,
    id: FileId,
    name: String,
    kind: ActionKind,
}

impl Drop for ActionSlot<'_> {
    fn drop(&mut self) {
        lock(self.active).remove(&self.id);
    }
}

fn lock(active: &ActiveActions) -> MutexGuard<'_, HashMap<FileId, ActionKind>> {
    active.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Final path component of a backend-supplied name, if it is usable.
fn safe_filename(name: &str) -> Option<String> {
    Path::new(name.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(ToOwned::to_owned)
}
