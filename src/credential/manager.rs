//! Credential lifecycle on top of a [`CredentialStore`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;

use super::{Credential, CredentialStore};
use crate::events::{SessionEvent, dispatch};
use crate::{ClientError, SecretString};

/// Owns the active credential for one client instance.
///
/// Every install and every revoke bumps the **epoch**. Requests remember the
/// epoch they were sent under; a response that comes back under a different
/// epoch belongs to a credential that no longer exists and is dropped by the
/// interceptor.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    ttl: Duration,
    epoch: AtomicU64,
}

impl CredentialManager {
    /// `ttl` is the fixed lifetime given to every installed credential.
    pub fn new(store: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// The active, unexpired credential.
    pub fn current(&self) -> Option<Credential> {
        self.store.get()
    }

    pub fn is_present(&self) -> bool {
        self.current().is_some()
    }

    /// Token to attach to outbound requests.
    pub fn bearer(&self) -> Option<SecretString> {
        self.current().map(|credential| credential.token)
    }

    /// Stores a freshly issued token and verifies that it stuck.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::CredentialNotPersisted` if the store does not
    /// hand the token back (for example a cookie jar refusing the cookie).
    /// The caller must not treat the session as authenticated in that case.
    pub async fn install(
        &self,
        token: SecretString,
        org_id: Option<i64>,
    ) -> Result<Credential, ClientError> {
        let credential = Credential::issue(token, self.ttl, org_id);
        self.store.set(credential.clone());
        self.epoch.fetch_add(1, Ordering::SeqCst);

        let persisted = self
            .store
            .get()
            .is_some_and(|stored| stored.token == credential.token);

        if !persisted {
            log::warn!(
                target: "orgsession::credential",
                "msg=\"credential not persisted after set\" token=\"{}\"",
                credential.token.fingerprint()
            );
            dispatch(SessionEvent::CredentialNotPersisted {
                at: chrono::Utc::now(),
            })
            .await;
            return Err(ClientError::CredentialNotPersisted);
        }

        log::debug!(
            target: "orgsession::credential",
            "msg=\"credential installed\" org_id={:?} epoch={}",
            org_id,
            self.epoch()
        );

        Ok(credential)
    }

    /// Re-tags the active credential with the organization the backend says
    /// it belongs to. Same token and expiry; bumps the epoch because the
    /// cache scope changes.
    pub fn rescope(&self, org_id: Option<i64>) -> Option<Credential> {
        let mut credential = self.store.get()?;
        if credential.org_id == org_id {
            return Some(credential);
        }
        credential.org_id = org_id;
        self.store.set(credential.clone());
        self.epoch.fetch_add(1, Ordering::SeqCst);
        Some(credential)
    }

    /// Clears the credential. Safe to call repeatedly.
    ///
    /// Returns the new epoch.
    pub fn revoke(&self) -> u64 {
        self.store.clear();
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            target: "orgsession::credential",
            "msg=\"credential revoked\" epoch={epoch}"
        );
        epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialConfig;
    use crate::credential::{CookieJarStore, InMemoryCredentialStore, SameSite};

    fn manager() -> CredentialManager {
        CredentialManager::new(Arc::new(InMemoryCredentialStore::new()), Duration::days(1))
    }

    #[tokio::test]
    async fn test_install_and_revoke_bump_epoch() {
        let manager = manager();
        assert_eq!(manager.epoch(), 0);
        assert!(!manager.is_present());

        let credential = manager.install(SecretString::new("tok"), Some(4)).await.unwrap();
        assert_eq!(credential.org_id, Some(4));
        assert_eq!(manager.epoch(), 1);
        assert_eq!(manager.bearer().unwrap().expose_secret(), "tok");

        assert_eq!(manager.revoke(), 2);
        assert!(!manager.is_present());
        assert!(manager.bearer().is_none());
    }

    #[tokio::test]
    async fn test_install_uses_configured_ttl() {
        let manager = manager();
        let credential = manager.install(SecretString::new("tok"), None).await.unwrap();

        assert_eq!(credential.expires_at - credential.issued_at, Duration::days(1));
    }

    #[tokio::test]
    async fn test_install_detects_rejected_cookie() {
        let config = CredentialConfig {
            same_site: SameSite::None,
            ..Default::default()
        };
        let store = Arc::new(CookieJarStore::new(&config, false));
        let manager = CredentialManager::new(store, Duration::days(1));

        let result = manager.install(SecretString::new("tok"), Some(1)).await;

        assert_eq!(result.unwrap_err(), ClientError::CredentialNotPersisted);
        assert!(!manager.is_present());
    }

    #[tokio::test]
    async fn test_rescope_keeps_token() {
        let manager = manager();
        assert!(manager.rescope(Some(1)).is_none());

        manager.install(SecretString::new("tok"), None).await.unwrap();
        let epoch = manager.epoch();

        let credential = manager.rescope(Some(9)).unwrap();
        assert_eq!(credential.org_id, Some(9));
        assert_eq!(credential.token.expose_secret(), "tok");
        assert_eq!(manager.epoch(), epoch + 1);

        manager.rescope(Some(9));
        assert_eq!(manager.epoch(), epoch + 1);
    }

    #[tokio::test]
    async fn test_revoke_when_empty_is_harmless() {
        let manager = manager();
        manager.revoke();
        manager.revoke();
        assert!(manager.current().is_none());
    }
}
