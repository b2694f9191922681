//! File catalog client.
//!
//! Keeps the account's file list fresh. The visible list is always the last
//! successful fetch minus the files whose removal is pending or confirmed;
//! nothing else mutates it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Notify};
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::FileStackerBackend;
use crate::models::{FileId, FileRecord};
use crate::util::{normalize_text_option, unix_millis_now};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The list was replaced; `count` is the number of visible files.
    Updated { count: usize },
    /// Another refresh was already in flight, so no request was made.
    Skipped,
}

/// External events that should trigger a silent refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    VisibilityRegained,
    FocusRegained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    InFlight,
    Confirmed,
    Failed,
}

impl Removal {
    const fn hides(self) -> bool {
        matches!(self, Self::InFlight | Self::Confirmed)
    }
}

/// Point-in-time view of the catalog for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    pub files: Vec<FileRecord>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub last_refreshed_at: Option<i64>,
}

#[derive(Debug, Default)]
struct CatalogState {
    fetched: Vec<FileRecord>,
    removals: HashMap<FileId, Removal>,
    loading: bool,
    last_error: Option<String>,
    last_refreshed_at: Option<i64>,
    search: Option<String>,
}

impl CatalogState {
    fn visible(&self) -> Vec<FileRecord> {
        self.fetched
            .iter()
            .filter(|file| !self.is_hidden(&file.id))
            .cloned()
            .collect()
    }

    fn is_hidden(&self, id: &FileId) -> bool {
        self.removals.get(id).is_some_and(|removal| removal.hides())
    }

    fn replace(&mut self, fetched: Vec<FileRecord>) {
        self.removals.retain(|id, removal| match removal {
            Removal::InFlight => true,
            Removal::Confirmed => fetched.iter().any(|file| &file.id == id),
            Removal::Failed => false,
        });
        self.fetched = fetched;
    }
}

pub struct CatalogClient<B> {
    backend: Arc<B>,
    state: Mutex<CatalogState>,
    in_flight: AtomicBool,
    /// Woken whenever the in-flight slot is released.
    idle: Notify,
    poll_interval: Duration,
    revision: watch::Sender<u64>,
}

impl<B: FileStackerBackend> CatalogClient<B> {
    pub fn new(backend: Arc<B>, poll_interval: Duration) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            backend,
            state: Mutex::new(CatalogState::default()),
            in_flight: AtomicBool::new(false),
            idle: Notify::new(),
            poll_interval,
            revision,
        }
    }

    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Fetch the file list and replace the local copy.
    ///
    /// A non-silent refresh raises the loading flag while the request runs
    /// and clears the list if it fails. A silent refresh never touches the
    /// loading flag and leaves the list untouched on failure. A refresh
    /// requested while another is in flight returns `Skipped`.
    pub async fn refresh(&self, silent: bool) -> Result<RefreshOutcome> {
        let Some(guard) = self.try_begin(silent) else {
            tracing::debug!(silent, "Catalog refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        self.fetch(guard).await
    }

    /// Refresh after a local change was committed on the backend.
    ///
    /// A refresh already in flight may have been answered before the change,
    /// so instead of skipping, this waits for it to finish and then issues
    /// its own request. Never returns `Skipped`.
    pub async fn refresh_after_change(&self, silent: bool) -> Result<RefreshOutcome> {
        let guard = loop {
            let idle = self.idle.notified();
            tokio::pin!(idle);
            // Register before checking the slot so a release in between is not missed.
            idle.as_mut().enable();
            if let Some(guard) = self.try_begin(silent) {
                break guard;
            }
            tracing::debug!(silent, "Waiting for in-flight catalog refresh");
            idle.await;
        };
        self.fetch(guard).await
    }

    fn try_begin(&self, silent: bool) -> Option<RefreshGuard<'_, B>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                client: self,
                silent,
            })
    }

    async fn fetch(&self, guard: RefreshGuard<'_, B>) -> Result<RefreshOutcome> {
        let silent = guard.silent;
        let search = {
            let mut state = self.lock();
            if !silent {
                state.loading = true;
            }
            state.search.clone()
        };
        if !silent {
            self.bump();
        }

        let result = self.backend.list_files(search.as_deref()).await;

        let outcome = {
            let mut state = self.lock();
            if !silent {
                state.loading = false;
            }
            match result {
                Ok(raw) => {
                    state.replace(raw.into_iter().map(FileRecord::from_raw).collect());
                    state.last_error = None;
                    state.last_refreshed_at = Some(unix_millis_now());
                    let count = state.visible().len();
                    tracing::debug!(silent, count, "Catalog refreshed");
                    Ok(RefreshOutcome::Updated { count })
                }
                Err(error) => {
                    state.last_error = Some(error.to_string());
                    if !silent {
                        state.fetched.clear();
                    }
                    Err(error)
                }
            }
        };
        drop(guard);
        self.bump();
        outcome
    }

    /// Drive refreshes until `shutdown` resolves: one non-silent refresh on
    /// mount, then a silent refresh every poll interval and on every
    /// trigger received.
    pub async fn run(
        &self,
        mut triggers: mpsc::Receiver<RefreshTrigger>,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            "Starting catalog polling"
        );

        tokio::select! {
            () = &mut shutdown => return,
            result = self.refresh(false) => log_failure(result, false),
        }

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut triggers_open = true;

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => log_failure(self.refresh(true).await, true),
                trigger = triggers.recv(), if triggers_open => match trigger {
                    Some(trigger) => {
                        tracing::debug!(?trigger, "Refresh trigger received");
                        log_failure(self.refresh(true).await, true);
                    }
                    None => triggers_open = false,
                },
            }
        }
        tracing::info!("Catalog polling stopped");
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        let state = self.lock();
        CatalogSnapshot {
            files: state.visible(),
            loading: state.loading,
            last_error: state.last_error.clone(),
            last_refreshed_at: state.last_refreshed_at,
        }
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.lock().visible()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Look up a visible file by id.
    pub fn find(&self, id: &FileId) -> Option<FileRecord> {
        let state = self.lock();
        if state.is_hidden(id) {
            return None;
        }
        state.fetched.iter().find(|file| &file.id == id).cloned()
    }

    /// Set the search term forwarded with every subsequent refresh.
    pub fn set_search(&self, search: Option<String>) {
        self.lock().search = normalize_text_option(search);
    }

    pub fn search(&self) -> Option<String> {
        self.lock().search.clone()
    }

    /// Hide a file while its deletion is in flight.
    pub fn begin_removal(&self, id: &FileId) {
        self.lock().removals.insert(id.clone(), Removal::InFlight);
        self.bump();
    }

    /// Record the outcome of a deletion started with `begin_removal`.
    ///
    /// A failed deletion stays hidden until the next successful refresh,
    /// which shows the file again if the backend still lists it.
    pub fn finish_removal(&self, id: &FileId, deleted: bool) {
        let mut state = self.lock();
        if let Some(removal) = state.removals.get_mut(id) {
            *removal = if deleted {
                Removal::Confirmed
            } else {
                Removal::Failed
            };
        }
    }

    /// Receiver that changes whenever the snapshot may have changed.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Drop every local record, e.g. on logout.
    pub fn clear(&self) {
        *self.lock() = CatalogState::default();
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the in-flight slot and the loading flag, including when the
/// refresh future is dropped mid-request.
struct RefreshGuard<'a, B> {
    client: &'a CatalogClient<B>,
    silent: bool,
}

impl<B> Drop for RefreshGuard<'_, B> {
    fn drop(&mut self) {
        if !self.silent {
            self.client
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .loading = false;
        }
        self.client.in_flight.store(false, Ordering::Release);
        self.client.idle.notify_waiters();
    }
}

fn log_failure(result: Result<RefreshOutcome>, silent: bool) {
    if let Err(error) = result {
        tracing::warn!(silent, "Catalog refresh failed: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::testing::{raw_record, FakeBackend};

    fn catalog(files: Vec<crate::models::RawFileRecord>) -> (Arc<FakeBackend>, CatalogClient<FakeBackend>) {
        let backend = Arc::new(FakeBackend::with_files(files));
        let catalog = CatalogClient::new(Arc::clone(&backend), Duration::from_secs(30));
        (backend, catalog)
    }

    fn ids(catalog: &CatalogClient<FakeBackend>) -> Vec<String> {
        catalog
            .files()
            .into_iter()
            .map(|file| file.id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn refresh_projects_raw_records() {
        let (_backend, catalog) = catalog(vec![raw_record("f1", "report.pdf")]);

        let outcome = catalog.refresh(false).await.unwrap();
        assert_eq!(outcome, RefreshOutcome::Updated { count: 1 });

        let snapshot = catalog.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.last_refreshed_at.is_some());
        assert_eq!(snapshot.files[0].human_size, "1.0 KB");
        assert_eq!(snapshot.files[0].owner_name, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn non_silent_refresh_raises_loading_flag() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        backend.state().list_delay = Some(Duration::from_secs(1));

        let (result, loading_during) = tokio::join!(catalog.refresh(false), async {
            tokio::task::yield_now().await;
            catalog.is_loading()
        });
        result.unwrap();
        assert!(loading_during);
        assert!(!catalog.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_refresh_never_touches_loading_flag() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        backend.state().list_delay = Some(Duration::from_secs(1));

        let (result, loading_during) = tokio::join!(catalog.refresh(true), async {
            tokio::task::yield_now().await;
            catalog.is_loading()
        });
        result.unwrap();
        assert!(!loading_during);
    }

    #[tokio::test]
    async fn failed_silent_refresh_keeps_the_list() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        catalog.refresh(false).await.unwrap();
        backend.state().list_failure = Some((500, "Internal Server Error".to_string()));

        assert!(catalog.refresh(true).await.is_err());
        assert_eq!(ids(&catalog), vec!["f1"]);
        assert_eq!(
            catalog.snapshot().last_error.as_deref(),
            Some("Internal Server Error")
        );
    }

    #[tokio::test]
    async fn failed_non_silent_refresh_clears_the_list() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        catalog.refresh(false).await.unwrap();
        backend.state().list_failure = Some((500, "Internal Server Error".to_string()));

        let error = catalog.refresh(false).await.unwrap_err();
        assert_eq!(error.to_string(), "Internal Server Error");
        assert!(catalog.files().is_empty());
        assert!(!catalog.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_issue_one_request() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        backend.state().list_delay = Some(Duration::from_millis(200));

        let (first, second) = tokio::join!(catalog.refresh(true), catalog.refresh(false));
        assert_eq!(first.unwrap(), RefreshOutcome::Updated { count: 1 });
        assert_eq!(second.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(backend.calls_matching("list").len(), 1);

        catalog.refresh(true).await.unwrap();
        assert_eq!(backend.calls_matching("list").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_after_change_waits_for_in_flight_poll() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        backend.state().list_delay = Some(Duration::from_millis(500));

        let (poll, after_change) = tokio::join!(catalog.refresh(true), async {
            tokio::task::yield_now().await;
            backend.state().files.push(raw_record("f2", "b.pdf"));
            catalog.refresh_after_change(false).await
        });
        assert_eq!(poll.unwrap(), RefreshOutcome::Updated { count: 2 });
        assert_eq!(
            after_change.unwrap(),
            RefreshOutcome::Updated { count: 2 }
        );
        assert_eq!(backend.calls_matching("list").len(), 2);
        assert_eq!(ids(&catalog), vec!["f1", "f2"]);
        assert!(!catalog.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_refresh_releases_loading_and_slot() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        backend.state().list_delay = Some(Duration::from_secs(5));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(100), catalog.refresh(false)).await;
        assert!(timed_out.is_err());
        assert!(!catalog.is_loading());

        backend.state().list_delay = None;
        assert_eq!(
            catalog.refresh(true).await.unwrap(),
            RefreshOutcome::Updated { count: 1 }
        );
        assert_eq!(backend.calls_matching("list").len(), 2);
    }

    #[tokio::test]
    async fn search_term_is_forwarded_on_every_refresh() {
        let (backend, catalog) = catalog(vec![
            raw_record("f1", "invoice.pdf"),
            raw_record("f2", "photo.png"),
        ]);
        catalog.set_search(Some("  invoice ".to_string()));

        catalog.refresh(false).await.unwrap();
        catalog.refresh(true).await.unwrap();
        assert_eq!(ids(&catalog), vec!["f1"]);
        assert_eq!(
            backend.calls_matching("list"),
            vec!["list invoice".to_string(), "list invoice".to_string()]
        );
    }

    #[tokio::test]
    async fn removal_hides_record_until_reconciled() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf"), raw_record("f2", "b.pdf")]);
        catalog.refresh(false).await.unwrap();
        let id = FileId::from("f1");

        catalog.begin_removal(&id);
        assert_eq!(ids(&catalog), vec!["f2"]);
        assert!(catalog.find(&id).is_none());

        // Refresh while the delete is in flight still hides it.
        catalog.refresh(true).await.unwrap();
        assert_eq!(ids(&catalog), vec!["f2"]);

        // Delete failed and the server still lists the file.
        catalog.finish_removal(&id, false);
        assert_eq!(ids(&catalog), vec!["f2"]);
        catalog.refresh(true).await.unwrap();
        assert_eq!(ids(&catalog), vec!["f1", "f2"]);
        assert_eq!(backend.calls_matching("list").len(), 3);
    }

    #[tokio::test]
    async fn confirmed_removal_survives_stale_listing() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf"), raw_record("f2", "b.pdf")]);
        catalog.refresh(false).await.unwrap();
        let id = FileId::from("f1");

        catalog.begin_removal(&id);
        catalog.finish_removal(&id, true);
        catalog.refresh(true).await.unwrap();
        assert_eq!(ids(&catalog), vec!["f2"]);

        backend.state().files.retain(|file| file.file_id != "f1");
        catalog.refresh(true).await.unwrap();
        assert_eq!(ids(&catalog), vec!["f2"]);
        assert!(catalog.lock().removals.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_on_mount_interval_and_triggers() {
        let (backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        let (trigger_tx, trigger_rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let driver = async {
            tokio::time::sleep(Duration::from_secs(65)).await;
            trigger_tx
                .send(RefreshTrigger::VisibilityRegained)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            stop_tx.send(()).unwrap();
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        tokio::join!(catalog.run(trigger_rx, shutdown), driver);

        // mount + ticks at 30s and 60s + visibility trigger
        assert_eq!(backend.calls_matching("list").len(), 4);
        assert_eq!(ids(&catalog), vec!["f1"]);
    }

    #[tokio::test]
    async fn clear_drops_records_and_search() {
        let (_backend, catalog) = catalog(vec![raw_record("f1", "a.pdf")]);
        catalog.set_search(Some("a".to_string()));
        catalog.refresh(false).await.unwrap();
        let mut changes = catalog.subscribe();

        catalog.clear();
        assert!(catalog.files().is_empty());
        assert_eq!(catalog.search(), None);
        assert!(changes.has_changed().unwrap());
    }
}
