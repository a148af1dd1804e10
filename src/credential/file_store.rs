//! File-based credential storage.
//!
//! Keeps the credential as a JSON document so it survives a restart of the
//! embedding application, the native counterpart of surviving a page reload.

use std::path::{Path, PathBuf};

use super::{Credential, CredentialStore};
use crate::ClientError;

/// Stores the credential in a single JSON file.
///
/// # Example
///
/// ```rust,ignore
/// use orgsession::credential::FileCredentialStore;
///
/// let store = FileCredentialStore::new("/home/me/.config/dashboard/credential.json")?;
/// ```
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates the store, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the directory cannot be created.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Storage(format!("Failed to create credential directory: {e}"))
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Option<Credential> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                log::warn!(
                    target: "orgsession::credential",
                    "msg=\"discarding unreadable credential file\" path=\"{}\" error=\"{e}\"",
                    self.path.display()
                );
                self.clear();
                None
            }
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, credential: Credential) {
        let content = match serde_json::to_string(&credential) {
            Ok(content) => content,
            Err(e) => {
                log::error!(
                    target: "orgsession::credential",
                    "msg=\"failed to serialize credential\" error=\"{e}\""
                );
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, content) {
            log::error!(
                target: "orgsession::credential",
                "msg=\"failed to write credential file\" path=\"{}\" error=\"{e}\"",
                self.path.display()
            );
        }
    }

    fn get(&self) -> Option<Credential> {
        let credential = self.read()?;
        if credential.is_expired() {
            self.clear();
            return None;
        }
        Some(credential)
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::error!(
                target: "orgsession::credential",
                "msg=\"failed to delete credential file\" path=\"{}\" error=\"{e}\"",
                self.path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use chrono::Duration;
    use rand::Rng;
    use rand::distributions::Alphanumeric;

    use super::*;
    use crate::SecretString;

    fn temp_file() -> PathBuf {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        env::temp_dir()
            .join(format!("orgsession_credential_test_{suffix}"))
            .join("credential.json")
    }

    fn cleanup(path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_survives_new_instance() {
        let path = temp_file();
        let store = FileCredentialStore::new(&path).unwrap();
        store.set(Credential::issue(SecretString::new("persisted"), Duration::hours(1), Some(3)));

        let reopened = FileCredentialStore::new(&path).unwrap();
        let credential = reopened.get().unwrap();
        assert_eq!(credential.token.expose_secret(), "persisted");
        assert_eq!(credential.org_id, Some(3));

        cleanup(&path);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let path = temp_file();
        let store = FileCredentialStore::new(&path).unwrap();
        store.set(Credential::issue(SecretString::new("x"), Duration::hours(1), None));

        store.clear();
        assert!(!path.exists());
        store.clear();
        assert!(store.get().is_none());

        cleanup(&path);
    }

    #[test]
    fn test_expired_file_is_removed() {
        let path = temp_file();
        let store = FileCredentialStore::new(&path).unwrap();
        store.set(Credential::issue(SecretString::new("x"), Duration::seconds(-1), None));

        assert!(store.get().is_none());
        assert!(!path.exists());

        cleanup(&path);
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let path = temp_file();
        let store = FileCredentialStore::new(&path).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(store.get().is_none());
        assert!(!path.exists());

        cleanup(&path);
    }
}
