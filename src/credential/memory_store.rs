//! In-memory credential storage.

use std::sync::{Arc, RwLock};

use super::{Credential, CredentialStore};

/// Keeps the credential in process memory.
///
/// The credential is lost when the process exits. Use
/// [`FileCredentialStore`](super::FileCredentialStore) to survive restarts.
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    slot: Arc<RwLock<Option<Credential>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts out holding `credential`.
    pub fn with(credential: Credential) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(credential))),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn set(&self, credential: Credential) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(credential);
        }
    }

    fn get(&self) -> Option<Credential> {
        let mut slot = self.slot.write().ok()?;
        if slot.as_ref().is_some_and(Credential::is_expired) {
            *slot = None;
        }
        slot.clone()
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }
}
