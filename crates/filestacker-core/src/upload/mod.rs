//! Sequential upload pipeline with per-batch progress.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::api::{FileStackerBackend, LocalFile};
use crate::catalog::CatalogClient;
use crate::models::FileRecord;
use crate::notifications::NotificationCenter;
use crate::{Error, Result};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "Files uploaded successfully!";

/// Progress of the batch currently being uploaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadProgress {
    /// Whether a batch is running.
    pub active: bool,
    /// Batch completion, 0 to 100.
    pub percent: f64,
    /// File currently being transmitted.
    pub current: Option<String>,
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub batch_id: Uuid,
    pub uploaded: Vec<FileRecord>,
}

/// Percentage reported for file `index` of a `total`-file batch: halfway
/// through that file's slice when it starts, the end of it when it finishes.
#[allow(clippy::cast_precision_loss)]
pub fn batch_progress(index: usize, total: usize, finished: bool) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let step = if finished { 1.0 } else { 0.5 };
    (index as f64 + step) / total as f64 * 100.0
}

pub struct UploadPipeline<B> {
    backend: Arc<B>,
    catalog: Arc<CatalogClient<B>>,
    notifications: Arc<NotificationCenter>,
    progress: watch::Sender<UploadProgress>,
}

impl<B: FileStackerBackend> UploadPipeline<B> {
    pub fn new(
        backend: Arc<B>,
        catalog: Arc<CatalogClient<B>>,
        notifications: Arc<NotificationCenter>,
    ) -> Self {
        let (progress, _) = watch::channel(UploadProgress::default());
        Self {
            backend,
            catalog,
            notifications,
            progress,
        }
    }

    /// Progress updates for the running batch.
    pub fn subscribe(&self) -> watch::Receiver<UploadProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> UploadProgress {
        self.progress.borrow().clone()
    }

    /// Upload `files` one at a time, in order.
    ///
    /// The first failing file aborts the batch: later files are not sent,
    /// files already sent stay on the server, and a single error
    /// notification is pushed. On success a notification is pushed and the
    /// catalog is refreshed. An empty batch does nothing.
    pub async fn upload(&self, files: Vec<LocalFile>) -> Result<UploadReport> {
        let batch_id = Uuid::now_v7();
        let total = files.len();
        if total == 0 {
            return Ok(UploadReport {
                batch_id,
                uploaded: Vec::new(),
            });
        }

        tracing::info!(%batch_id, total, "Starting upload batch");
        self.publish(UploadProgress {
            active: true,
            total,
            ..UploadProgress::default()
        });

        let mut uploaded = Vec::with_capacity(total);
        for (index, file) in files.iter().enumerate() {
            self.publish(UploadProgress {
                active: true,
                percent: batch_progress(index, total, false),
                current: Some(file.name.clone()),
                completed: index,
                total,
            });
            tracing::debug!(%batch_id, filename = %file.name, size = file.size(), "Uploading file");

            match self.backend.upload_file(file).await {
                Ok(raw) => uploaded.push(FileRecord::from_raw(raw)),
                Err(error) => {
                    tracing::warn!(
                        %batch_id,
                        filename = %file.name,
                        completed = index,
                        "Upload batch aborted: {}",
                        error
                    );
                    self.notifications
                        .error(format!("Failed to upload file: {error}"));
                    self.publish(UploadProgress::default());
                    return Err(Error::UploadAborted {
                        filename: file.name.clone(),
                        completed: index,
                        source: Box::new(error),
                    });
                }
            }

            self.publish(UploadProgress {
                active: true,
                percent: batch_progress(index, total, true),
                current: None,
                completed: index + 1,
                total,
            });
        }

        tracing::info!(%batch_id, uploaded = uploaded.len(), "Upload batch finished");
        if let Err(error) = self.catalog.refresh_after_change(false).await {
            self.notifications
                .error(format!("Failed to refresh files: {error}"));
        }
        self.notifications.success(UPLOAD_SUCCESS_MESSAGE);
        self.publish(UploadProgress::default());

        Ok(UploadReport { batch_id, uploaded })
    }

    fn publish(&self, progress: UploadProgress) {
        self.progress.send_replace(progress);
    }
}
