//! Explicit application context.
//!
//! Owns the backend handle and every client component, and defines the
//! session lifecycle: `init` on start, `teardown` on logout.

use std::sync::Arc;

use crate::actions::FileActionDispatcher;
use crate::api::{FileStackerBackend, HttpBackend};
use crate::auth::{SessionGateway, SessionPersistence};
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::models::{Session, SettingsUpdate, StorageStats, UserSettings};
use crate::notifications::NotificationCenter;
use crate::upload::UploadPipeline;
use crate::{Error, Result};

pub struct AppContext<B, S> {
    config: ClientConfig,
    backend: Arc<B>,
    gateway: SessionGateway<B, S>,
    catalog: Arc<CatalogClient<B>>,
    uploads: UploadPipeline<B>,
    actions: FileActionDispatcher<B>,
    notifications: Arc<NotificationCenter>,
}

impl<S: SessionPersistence> AppContext<HttpBackend, S> {
    /// Build a context talking HTTP to `config.api_base_url`.
    pub fn connect(config: ClientConfig, store: S) -> Result<Self> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::new(config, backend, store))
    }
}

impl<B: FileStackerBackend, S: SessionPersistence> AppContext<B, S> {
    pub fn new(config: ClientConfig, backend: B, store: S) -> Self {
        let backend = Arc::new(backend);
        let notifications = Arc::new(NotificationCenter::new());
        let catalog = Arc::new(CatalogClient::new(
            Arc::clone(&backend),
            config.poll_interval,
        ));
        let uploads = UploadPipeline::new(
            Arc::clone(&backend),
            Arc::clone(&catalog),
            Arc::clone(&notifications),
        );
        let actions = FileActionDispatcher::new(
            Arc::clone(&backend),
            Arc::clone(&catalog),
            Arc::clone(&notifications),
        );

        Self {
            gateway: SessionGateway::new(Arc::clone(&backend), store),
            config,
            backend,
            catalog,
            uploads,
            actions,
            notifications,
        }
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn gateway(&self) -> &SessionGateway<B, S> {
        &self.gateway
    }

    pub fn catalog(&self) -> &CatalogClient<B> {
        &self.catalog
    }

    pub const fn uploads(&self) -> &UploadPipeline<B> {
        &self.uploads
    }

    pub const fn actions(&self) -> &FileActionDispatcher<B> {
        &self.actions
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Restore the mirrored session and, if it is still valid, load the
    /// catalog. A failed initial load becomes an error notification.
    pub async fn init(&self) -> Result<Option<Session>> {
        let session = self.gateway.restore().await?;
        if session.is_some() {
            self.load_catalog().await;
        }
        Ok(session)
    }

    /// Log in and load the catalog.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let session = self.gateway.login(email, password).await?;
        self.load_catalog().await;
        Ok(session)
    }

    /// Register and load the (empty) catalog.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        user_name: &str,
        org_name: &str,
    ) -> Result<Session> {
        let session = self
            .gateway
            .register(email, password, user_name, org_name)
            .await?;
        self.load_catalog().await;
        Ok(session)
    }

    /// Log out and drop every piece of per-session state. Local state is
    /// cleared even when the logout request fails.
    pub async fn teardown(&self) -> Result<()> {
        let result = if self.gateway.is_logged_in() {
            self.gateway.logout().await
        } else {
            Ok(())
        };
        self.catalog.clear();
        self.notifications.clear();
        result
    }

    pub async fn stats(&self) -> Result<StorageStats> {
        self.gateway.require_session()?;
        self.backend.stats().await
    }

    pub async fn settings(&self) -> Result<UserSettings> {
        let session = self.gateway.require_session()?;
        self.backend.settings(&session.user_id).await
    }

    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<UserSettings> {
        if update.is_empty() {
            return Err(Error::InvalidInput(
                "Nothing to update; pass a theme or notification preference".to_string(),
            ));
        }
        let session = self.gateway.require_session()?;
        self.backend.update_settings(&session.user_id, update).await
    }

    async fn load_catalog(&self) {
        if let Err(error) = self.catalog.refresh(false).await {
            self.notifications
                .error(format!("Failed to load files: {error}"));
        }
    }
}
