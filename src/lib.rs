//! Session, tenant authorization and read-cache consistency for
//! multi-organization dashboard clients.
//!
//! The crate sits between UI code and a REST backend:
//!
//! - [`credential`] holds the single bearer credential and its epoch.
//! - [`interceptor`] attaches the credential to every call and handles
//!   401/403 centrally (clear, redirect once, swallow).
//! - [`cache`] memoizes idempotent reads and invalidates them from an
//!   explicit write table.
//! - [`permissions`] resolves tab visibility from role and override table.
//! - [`session`] and [`invitation`] drive login, organization switch and
//!   invitation acceptance.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orgsession::{ApiClient, ClientConfig, SessionManager};
//! use orgsession::credential::InMemoryCredentialStore;
//! use orgsession::interceptor::HeadlessNavigator;
//! use orgsession::transport::HttpTransport;
//!
//! let config = ClientConfig::new("https://api.example.com");
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let client = ApiClient::new(
//!     &config,
//!     transport,
//!     Arc::new(InMemoryCredentialStore::new()),
//!     Arc::new(HeadlessNavigator::new()),
//! );
//! let session = SessionManager::new(Arc::new(client), &config);
//!
//! session.login("a@x.com", "secret".into(), None).await?;
//! if session.can_view("billing") {
//!     let clients: Vec<serde_json::Value> = session.client().get_json("/clients", &[]).await?;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod credential;
pub mod events;
pub mod interceptor;
pub mod invitation;
pub mod permissions;
pub mod session;
pub mod transport;
pub mod validators;

mod client;
mod secret;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

use std::fmt;

pub use client::{ApiClient, TabView};
pub use config::ClientConfig;
pub use events::register_event_listeners;
pub use invitation::{InvitationFlow, InvitationKind, InvitationState};
pub use permissions::{AccessSnapshot, OverrideTable, PermissionResolver, Role};
pub use secret::SecretString;
pub use session::{Identity, Organization, SessionManager, SessionState};

/// Errors surfaced to callers.
///
/// A rejected session (401/403) is deliberately absent: the interceptor
/// handles it and callers receive an empty result instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Structured 4xx rejection, flattened to one displayable message.
    Validation(String),
    /// Timeout or connectivity failure. Safe to retry.
    Transient(String),
    /// Any other non-success status.
    Http { status: u16, message: String },
    /// Response body did not have the expected shape.
    Decode(String),
    /// Login rejected.
    InvalidCredentials,
    /// The credential store refused the token.
    CredentialNotPersisted,
    /// Invitation token is expired, used or malformed.
    InvalidInvitation(String),
    /// Operation not allowed in the current session state.
    InvalidState(String),
    Storage(String),
    Configuration(String),
}

impl ClientError {
    /// Whether the UI should offer a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl std::error::Error for ClientError {}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::Transient(msg) => write!(f, "Network error: {msg}"),
            Self::Http { status, message } => write!(f, "Request failed ({status}): {message}"),
            Self::Decode(msg) => write!(f, "Unexpected response: {msg}"),
            Self::InvalidCredentials => write!(f, "Invalid email or password"),
            Self::CredentialNotPersisted => write!(
                f,
                "Your browser blocked the session cookie; check cookie settings and try again"
            ),
            Self::InvalidInvitation(msg) => write!(f, "Invalid invitation: {msg}"),
            Self::InvalidState(msg) => write!(f, "Invalid session state: {msg}"),
            Self::Storage(msg) => write!(f, "Storage error: {msg}"),
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl From<validators::ValidationError> for ClientError {
    fn from(err: validators::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
