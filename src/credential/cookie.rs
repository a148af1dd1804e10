//! Cookie-backed credential storage.
//!
//! Mirrors how a browser stores the bearer token: as a cookie whose `Secure`
//! flag follows the transport scheme and whose `SameSite` policy is
//! configurable for cross-site frontend/backend deployments.

use std::sync::RwLock;

use chrono::Utc;

use super::{Credential, CredentialStore};
use crate::config::{ClientConfig, CredentialConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    None,
    #[default]
    Lax,
    Strict,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        }
    }
}

/// Attributes written alongside the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieAttributes {
    /// Builds attributes from configuration. `secure` should be true when the
    /// backend is reached over TLS.
    pub fn new(config: &CredentialConfig, secure: bool) -> Self {
        Self {
            name: config.cookie_name.clone(),
            path: config.cookie_path.clone(),
            secure,
            same_site: config.same_site,
        }
    }

    /// Browsers drop `SameSite=None` cookies that are not also `Secure`.
    pub fn is_accepted(&self) -> bool {
        self.same_site != SameSite::None || self.secure
    }

    /// Renders a `Set-Cookie` header value for the credential.
    pub fn header_value(&self, credential: &Credential) -> String {
        let max_age = (credential.expires_at - Utc::now()).num_seconds().max(0);
        let mut value = format!(
            "{}={}; Max-Age={}; Path={}",
            self.name,
            credential.token.expose_secret(),
            max_age,
            self.path
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value.push_str("; SameSite=");
        value.push_str(self.same_site.as_str());
        value
    }
}

/// Credential store with cookie semantics.
///
/// A cookie the browser would refuse is not stored, and the previously stored
/// cookie (if any) stays in place, exactly like a real jar.
pub struct CookieJarStore {
    attributes: CookieAttributes,
    cookie: RwLock<Option<Credential>>,
}

impl CookieJarStore {
    pub fn new(config: &CredentialConfig, secure: bool) -> Self {
        Self {
            attributes: CookieAttributes::new(config, secure),
            cookie: RwLock::new(None),
        }
    }

    /// A jar whose `Secure` attribute follows the scheme of `config.base_url`.
    pub fn for_client(config: &ClientConfig) -> Self {
        Self::new(&config.credential, config.is_tls())
    }

    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    /// The `Set-Cookie` value for the stored credential, if any.
    pub fn set_cookie_header(&self) -> Option<String> {
        self.get()
            .map(|credential| self.attributes.header_value(&credential))
    }
}

impl CredentialStore for CookieJarStore {
    fn set(&self, credential: Credential) {
        if !self.attributes.is_accepted() {
            log::warn!(
                target: "orgsession::credential",
                "msg=\"cookie rejected by jar policy\" cookie=\"{}\" same_site=\"{}\" secure={}",
                self.attributes.name,
                self.attributes.same_site.as_str(),
                self.attributes.secure
            );
            return;
        }

        if let Ok(mut cookie) = self.cookie.write() {
            *cookie = Some(credential);
        }
    }

    fn get(&self) -> Option<Credential> {
        let mut cookie = self.cookie.write().ok()?;
        if cookie.as_ref().is_some_and(Credential::is_expired) {
            *cookie = None;
        }
        cookie.clone()
    }

    fn clear(&self) {
        if let Ok(mut cookie) = self.cookie.write() {
            *cookie = None;
        }
    }
}
