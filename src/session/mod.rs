//! Session state machine.
//!
//! ```text
//! anonymous -> authenticating -> [org-selection-pending] -> active(org=X)
//! active(org=X) -> authenticating -> active(org=Y)        (switch)
//! any state -> anonymous                                  (logout, expiry, 401/403)
//! ```

mod manager;
mod types;

pub use manager::{LoginOutcome, SessionManager};
pub use types::{Identity, Organization};

use crate::permissions::AccessSnapshot;

/// An authenticated session bound to one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub identity: Identity,
    pub access: AccessSnapshot,
}

impl ActiveSession {
    pub fn org_id(&self) -> Option<i64> {
        self.identity.org_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    /// Login succeeded for a user with several organizations and did not say
    /// which one.
    OrgSelectionPending { organizations: Vec<Organization> },
    Active(ActiveSession),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::OrgSelectionPending { .. } => "org_selection_pending",
            Self::Active(_) => "active",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        match self {
            Self::Active(session) => Some(session),
            _ => None,
        }
    }

    /// Organization of the active session.
    pub fn org_id(&self) -> Option<i64> {
        self.active().and_then(ActiveSession::org_id)
    }
}
