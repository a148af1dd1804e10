//! Invitation acceptance.
//!
//! ```text
//! unvalidated -> valid | invalid
//! valid -> accepting -> accepted | accept-failed
//! accept-failed -> accepting                      (retry)
//! ```
//!
//! `invalid` and `accepted` are terminal.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::{SessionEvent, dispatch};
use crate::permissions::Role;
use crate::session::SessionState;
use crate::transport::ApiRequest;
use crate::validators::{PasswordPolicy, validate_invite_token};
use crate::{ApiClient, ClientError, SecretString, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationKind {
    /// Invitee becomes the admin of a newly created organization.
    #[serde(rename = "ORG_ADMIN")]
    OrgAdmin,
    /// Invitee joins an existing organization.
    #[serde(rename = "ORG_MEMBER")]
    OrgMember,
}

impl InvitationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrgAdmin => "ORG_ADMIN",
            Self::OrgMember => "ORG_MEMBER",
        }
    }
}

impl fmt::Display for InvitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `GET /auth/invite/validate` says about a token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InvitationDetails {
    pub valid: bool,
    #[serde(default)]
    pub org_name: Option<String>,
    #[serde(default, rename = "invitation_type")]
    pub kind: Option<InvitationKind>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Whether the invitee already has an account. Not every backend says;
    /// `None` leaves the password optional and the server decides.
    #[serde(default)]
    pub existing_user: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationState {
    Unvalidated,
    Valid,
    Invalid { message: String },
    Accepting,
    Accepted,
    AcceptFailed { message: String },
}

impl InvitationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::Accepted)
    }
}

/// One invitation link being validated and accepted.
#[derive(Debug)]
pub struct InvitationFlow {
    token: String,
    state: InvitationState,
    details: Option<InvitationDetails>,
    policy: PasswordPolicy,
}

impl InvitationFlow {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into().trim().to_owned(),
            state: InvitationState::Unvalidated,
            details: None,
            policy: PasswordPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &InvitationState {
        &self.state
    }

    /// Details from the last successful validation.
    pub fn details(&self) -> Option<&InvitationDetails> {
        self.details.as_ref()
    }

    /// Whether accepting needs a new password. Only known when validation
    /// reported the invitee as a new user.
    pub fn requires_password(&self) -> bool {
        self.existing_user() == Some(false)
    }

    fn existing_user(&self) -> Option<bool> {
        self.details.as_ref().and_then(|d| d.existing_user)
    }

    /// Checks the token with the backend. Read-only; safe to repeat until
    /// the flow is terminal.
    ///
    /// # Errors
    ///
    /// Transient failures. The flow stays where it was so the check can be
    /// retried.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "validate_invitation", skip_all, err))]
    pub async fn validate(&mut self, client: &ApiClient) -> Result<&InvitationState, ClientError> {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }

        if let Err(e) = validate_invite_token(&self.token) {
            self.invalidate(e.to_string());
            return Ok(&self.state);
        }

        let body = match client
            .get_value("/auth/invite/validate", &[("token", self.token.as_str())])
            .await
        {
            Ok(body) => body,
            Err(ClientError::Validation(message)) => {
                self.invalidate(message);
                return Ok(&self.state);
            }
            Err(ClientError::Http { status: 404, .. }) => {
                self.invalidate("Invitation not found".to_owned());
                return Ok(&self.state);
            }
            Err(e) => return Err(e),
        };

        let details: InvitationDetails = serde_json::from_value(body)
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if details.valid {
            log::debug!(
                target: "orgsession::invitation",
                "msg=\"invitation valid\" kind={:?} existing_user={:?}",
                details.kind,
                details.existing_user
            );
            self.details = Some(details);
            if !matches!(self.state, InvitationState::AcceptFailed { .. }) {
                self.state = InvitationState::Valid;
            }
        } else {
            let message = details
                .message
                .clone()
                .unwrap_or_else(|| "This invitation is no longer valid".to_owned());
            self.invalidate(message);
        }
        Ok(&self.state)
    }

    /// Accepts the invitation and moves `session` straight to active.
    ///
    /// Existing users pass `None` (any password given is not sent). New
    /// identities must pass a password meeting the flow's policy. When
    /// validation did not say which one the invitee is, a password is sent
    /// only if given, and checked against the policy first.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the flow is valid or accept-failed
    /// - `Validation` for a missing or weak password (nothing sent)
    /// - the backend's rejection, leaving the flow in accept-failed
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "accept_invitation", skip_all, err))]
    pub async fn accept(
        &mut self,
        session: &SessionManager,
        password: Option<SecretString>,
    ) -> Result<SessionState, ClientError> {
        if !matches!(
            self.state,
            InvitationState::Valid | InvitationState::AcceptFailed { .. }
        ) {
            return Err(ClientError::InvalidState(format!(
                "cannot accept an invitation in state {:?}",
                self.state
            )));
        }

        let mut body = Map::new();
        body.insert("token".to_owned(), Value::String(self.token.clone()));
        let password = match self.existing_user() {
            Some(true) => None,
            Some(false) => Some(password.unwrap_or_else(|| SecretString::new(""))),
            None => password.filter(|p| !p.expose_secret().is_empty()),
        };
        if let Some(password) = password {
            let email = self.details.as_ref().and_then(|d| d.email.as_deref());
            self.policy.validate_for(password.expose_secret(), email)?;
            body.insert(
                "password".to_owned(),
                Value::String(password.expose_secret().to_owned()),
            );
        }

        self.state = InvitationState::Accepting;
        let request = ApiRequest::post("/auth/invite/accept").json(&body);

        let token = match session.client().send(request).await {
            Ok(response) => response
                .body
                .get("access_token")
                .and_then(Value::as_str)
                .map(SecretString::new),
            Err(e) => return Err(self.accept_failed(e)),
        };
        let Some(token) = token else {
            let err = ClientError::InvalidInvitation("the invitation was not accepted".to_owned());
            return Err(self.accept_failed(err));
        };

        self.state = InvitationState::Accepted;
        let details = self.details.clone().unwrap_or_default();
        log::info!(
            target: "orgsession::invitation",
            "msg=\"invitation accepted\" kind={:?} existing_user={:?}",
            details.kind,
            details.existing_user
        );
        dispatch(SessionEvent::InvitationAccepted {
            email: details.email,
            org_name: details.org_name,
            at: Utc::now(),
        })
        .await;

        session.activate_with_token(token).await
    }

    fn invalidate(&mut self, message: String) {
        log::info!(
            target: "orgsession::invitation",
            "msg=\"invitation invalid\" reason=\"{message}\""
        );
        self.state = InvitationState::Invalid { message };
    }

    fn accept_failed(&mut self, err: ClientError) -> ClientError {
        log::warn!(
            target: "orgsession::invitation",
            "msg=\"invitation accept failed\" error=\"{err}\""
        );
        self.state = InvitationState::AcceptFailed {
            message: err.to_string(),
        };
        err
    }
}
