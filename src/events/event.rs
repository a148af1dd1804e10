use chrono::{DateTime, Utc};

/// Session lifecycle events.
///
/// Fired by the session manager, the interceptor and the invitation flow. If
/// no listeners are registered they are silently ignored. Register listeners
/// via [`register_event_listeners`](crate::register_event_listeners).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    // authentication
    LoginSucceeded {
        user_id: i64,
        email: String,
        org_id: Option<i64>,
        at: DateTime<Utc>,
    },
    LoginFailed {
        email: String,
        reason: String,
        at: DateTime<Utc>,
    },
    LoggedOut {
        user_id: Option<i64>,
        at: DateTime<Utc>,
    },

    // organizations
    OrganizationSelectionRequired {
        email: String,
        organizations: usize,
        at: DateTime<Utc>,
    },
    OrganizationSwitched {
        from: Option<i64>,
        to: i64,
        at: DateTime<Utc>,
    },

    // credential
    SessionInvalidated {
        reason: String,
        at: DateTime<Utc>,
    },
    CredentialNotPersisted {
        at: DateTime<Utc>,
    },

    // invitation
    InvitationAccepted {
        email: Option<String>,
        org_name: Option<String>,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginSucceeded { .. } => "session.login.success",
            Self::LoginFailed { .. } => "session.login.failed",
            Self::LoggedOut { .. } => "session.logout",
            Self::OrganizationSelectionRequired { .. } => "session.org.selection_required",
            Self::OrganizationSwitched { .. } => "session.org.switched",
            Self::SessionInvalidated { .. } => "session.invalidated",
            Self::CredentialNotPersisted { .. } => "session.credential.not_persisted",
            Self::InvitationAccepted { .. } => "invitation.accepted",
        }
    }

    /// The user lost their session, or could not get one.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::LoginFailed { .. }
                | Self::SessionInvalidated { .. }
                | Self::CredentialNotPersisted { .. }
        )
    }

    /// Organization the event concerns, when it names one.
    pub fn org_id(&self) -> Option<i64> {
        match self {
            Self::LoginSucceeded { org_id, .. } => *org_id,
            Self::OrganizationSwitched { to, .. } => Some(*to),
            _ => None,
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::LoginSucceeded { at, .. }
            | Self::LoginFailed { at, .. }
            | Self::LoggedOut { at, .. }
            | Self::OrganizationSelectionRequired { at, .. }
            | Self::OrganizationSwitched { at, .. }
            | Self::SessionInvalidated { at, .. }
            | Self::CredentialNotPersisted { at }
            | Self::InvitationAccepted { at, .. } => *at,
        }
    }
}
