//! In-process doubles for tests and demos.
//!
//! [`MockBackend`] is a [`Transport`](crate::transport::Transport) that
//! answers the dashboard API from memory. [`RejectingCredentialStore`] is a
//! credential store that silently drops everything.

mod backend;

pub use backend::MockBackend;

use crate::credential::{Credential, CredentialStore};

/// Accepts every write and keeps nothing, like a browser refusing a cookie.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectingCredentialStore;

impl CredentialStore for RejectingCredentialStore {
    fn set(&self, _credential: Credential) {}

    fn get(&self) -> Option<Credential> {
        None
    }

    fn clear(&self) {}
}
