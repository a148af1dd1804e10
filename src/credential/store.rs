//! Credential store trait.

use super::Credential;

/// Storage for the single active credential.
///
/// Implementations:
/// - [`InMemoryCredentialStore`](super::InMemoryCredentialStore): lives as long as the process
/// - [`CookieJarStore`](super::CookieJarStore): cookie semantics, including browser rejection rules
/// - [`FileCredentialStore`](super::FileCredentialStore): survives restarts
///
/// None of the operations fail. A backend that cannot persist a credential
/// simply does not return it from `get`; [`CredentialManager`](super::CredentialManager)
/// reads back after every `set` to detect that.
pub trait CredentialStore: Send + Sync {
    /// Stores the credential, replacing any previous one.
    fn set(&self, credential: Credential);

    /// Returns the stored credential unless it is missing or expired.
    fn get(&self) -> Option<Credential>;

    /// Removes the credential. Idempotent.
    fn clear(&self);
}
