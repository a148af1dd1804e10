//! Bearer credential storage.
//!
//! A session holds at most one [`Credential`]. Backends implement
//! [`CredentialStore`]; the [`CredentialManager`] sits in front of whichever
//! backend is in use and tracks the credential epoch.

mod cookie;
mod file_store;
mod manager;
mod memory_store;
mod store;

use chrono::{DateTime, Duration, Utc};
pub use cookie::{CookieAttributes, CookieJarStore, SameSite};
pub use file_store::FileCredentialStore;
pub use manager::CredentialManager;
pub use memory_store::InMemoryCredentialStore;
use serde::{Deserialize, Serialize};
pub use store::CredentialStore;

use crate::SecretString;

/// An issued bearer token.
///
/// The expiry is fixed at issuance. The client never pushes it forward; a
/// fresh credential comes only from login, organization switch or invitation
/// accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: SecretString,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Organization the token is scoped to. `None` for a provisional token
    /// issued while the user still has to pick an organization.
    pub org_id: Option<i64>,
}

impl Credential {
    /// Issues a credential valid for `ttl` from now.
    pub fn issue(token: SecretString, ttl: Duration, org_id: Option<i64>) -> Self {
        let now = Utc::now();
        Self {
            token,
            issued_at: now,
            expires_at: now + ttl,
            org_id,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Seconds until expiry, never negative.
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}
