//! Session/auth gateway.
//!
//! Authentication itself is owned by the backend. The gateway only wraps the
//! login/register/logout calls, keeps the current identity in memory, and
//! mirrors it (with the cookie header needed to resume it) into a
//! `SessionPersistence` store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{Credentials, FileStackerBackend, Registration};
use crate::models::{Session, StoredSession};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Client-side storage for the mirrored session.
pub trait SessionPersistence: Send + Sync {
    fn load_session(&self) -> Result<Option<StoredSession>>;
    fn save_session(&self, session: &StoredSession) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

/// Process-local session store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<StoredSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<StoredSession>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> Result<Option<StoredSession>> {
        Ok(self.slot().clone())
    }

    fn save_session(&self, session: &StoredSession) -> Result<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

pub struct SessionGateway<B, S> {
    backend: Arc<B>,
    store: S,
    current: Mutex<Option<Session>>,
}

impl<B: FileStackerBackend, S: SessionPersistence> SessionGateway<B, S> {
    pub fn new(backend: Arc<B>, store: S) -> Self {
        Self {
            backend,
            store,
            current: Mutex::new(None),
        }
    }

    /// The signed-in identity, if any.
    pub fn current(&self) -> Option<Session> {
        self.slot().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.slot().is_some()
    }

    /// The signed-in identity, or `Error::NotAuthenticated`.
    pub fn require_session(&self) -> Result<Session> {
        self.current().ok_or(Error::NotAuthenticated)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let credentials = Credentials::new(email, password)?;
        let session = self.backend.login(&credentials).await?;
        tracing::info!(user_id = %session.user_id, "Logged in");
        self.establish(session)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        user_name: &str,
        org_name: &str,
    ) -> Result<Session> {
        let registration =
            Registration::new(Credentials::new(email, password)?, user_name, org_name)?;
        let session = self.backend.register(&registration).await?;
        tracing::info!(user_id = %session.user_id, "Registered account");
        self.establish(session)
    }

    /// End the session. Local state is cleared even when the backend call
    /// fails; that failure is still returned.
    pub async fn logout(&self) -> Result<()> {
        let remote = self.backend.logout().await;
        self.forget();
        let local = self.store.clear_session();

        if let Err(error) = &remote {
            tracing::warn!("Logout request failed, cleared local session anyway: {}", error);
        }
        remote.and(local)
    }

    /// Resume a mirrored session.
    ///
    /// The stored credentials are re-installed and verified with a "who am
    /// I" probe. Any probe failure means "not logged in" and drops the
    /// mirrored copy.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };

        if let Some(cookies) = stored.cookies.as_deref() {
            self.backend.restore_credentials(cookies);
        }

        match self.backend.who_am_i().await {
            Ok(session) => {
                tracing::debug!(user_id = %session.user_id, "Restored session");
                let cookies = self.backend.credential_snapshot().or(stored.cookies);
                self.store.save_session(&StoredSession {
                    session: session.clone(),
                    cookies,
                    saved_at: unix_millis_now(),
                })?;
                *self.slot() = Some(session.clone());
                Ok(Some(session))
            }
            Err(error) => {
                tracing::warn!("Stored session is no longer valid: {}", error);
                self.forget();
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    fn establish(&self, session: Session) -> Result<Session> {
        self.store.save_session(&StoredSession {
            session: session.clone(),
            cookies: self.backend.credential_snapshot(),
            saved_at: unix_millis_now(),
        })?;
        *self.slot() = Some(session.clone());
        Ok(session)
    }

    fn forget(&self) {
        self.backend.clear_credentials();
        *self.slot() = None;
    }

    fn slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::{session, FakeBackend};

    fn gateway() -> (Arc<FakeBackend>, MemorySessionStore, SessionGateway<FakeBackend, MemorySessionStore>) {
        let backend = Arc::new(FakeBackend::default());
        let store = MemorySessionStore::new();
        let gateway = SessionGateway::new(Arc::clone(&backend), store.clone());
        (backend, store, gateway)
    }

    #[tokio::test]
    async fn login_mirrors_session_with_cookies() {
        let (_backend, store, gateway) = gateway();

        let session = gateway.login("ada@acme.io", "secret").await.unwrap();
        assert_eq!(session.user_id, "u1");
        assert!(gateway.is_logged_in());

        let stored = store.load_session().unwrap().unwrap();
        assert_eq!(stored.session, session);
        assert_eq!(stored.cookies.as_deref(), Some("fs_session=token-1"));
    }

    #[tokio::test]
    async fn login_rejects_blank_credentials_without_a_request() {
        let (backend, _store, gateway) = gateway();

        let error = gateway.login("  ", "secret").await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_login_leaves_no_session() {
        let (backend, store, gateway) = gateway();
        backend.state().login_failure = Some((401, "Invalid credentials".to_string()));

        let error = gateway.login("ada@acme.io", "wrong").await.unwrap_err();
        assert_eq!(error.to_string(), "Invalid credentials");
        assert!(!gateway.is_logged_in());
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn register_establishes_session() {
        let (_backend, _store, gateway) = gateway();

        let session = gateway
            .register("grace@acme.io", "secret", "Grace", "Acme")
            .await
            .unwrap();
        assert_eq!(session.user_name, "Grace");
        assert_eq!(gateway.current(), Some(session));
    }

    #[tokio::test]
    async fn restore_reinstalls_credentials_and_probes() {
        let (backend, store, gateway) = gateway();
        backend.state().session = Some(session());
        store
            .save_session(&StoredSession {
                session: session(),
                cookies: Some("fs_session=saved".to_string()),
                saved_at: 0,
            })
            .unwrap();

        let restored = gateway.restore().await.unwrap();
        assert_eq!(restored, Some(session()));
        assert_eq!(
            backend.state().restored_credentials.as_deref(),
            Some("fs_session=saved")
        );
        assert_eq!(backend.calls(), vec!["me".to_string()]);
    }

    #[tokio::test]
    async fn restore_probe_failure_means_logged_out() {
        let (backend, store, gateway) = gateway();
        backend.state().who_am_i_failure = Some((500, "Internal Server Error".to_string()));
        store
            .save_session(&StoredSession {
                session: session(),
                cookies: None,
                saved_at: 0,
            })
            .unwrap();

        assert_eq!(gateway.restore().await.unwrap(), None);
        assert!(!gateway.is_logged_in());
        assert!(store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_without_stored_session_skips_probe() {
        let (backend, _store, gateway) = gateway();

        assert_eq!(gateway.restore().await.unwrap(), None);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn logout_clears_local_state_even_when_request_fails() {
        let (backend, store, gateway) = gateway();
        gateway.login("ada@acme.io", "secret").await.unwrap();
        backend.state().logout_failure = Some((503, "Service Unavailable".to_string()));

        let error = gateway.logout().await.unwrap_err();
        assert_eq!(error.to_string(), "Service Unavailable");
        assert!(!gateway.is_logged_in());
        assert!(store.load_session().unwrap().is_none());
        assert!(matches!(
            gateway.require_session(),
            Err(Error::NotAuthenticated)
        ));
    }
}
