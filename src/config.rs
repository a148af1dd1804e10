//! Configuration types for the session client.
//!
//! Everything deployment-specific lives here: the backend base URL, the
//! credential lifetime and cookie attributes, the read-cache TTL, request
//! timeouts and the liveness probe cadence.
//!
//! # Example
//!
//! ```rust
//! use orgsession::config::{ClientConfig, CacheConfig, TimeoutConfig};
//! use chrono::Duration;
//!
//! let config = ClientConfig {
//!     base_url: "https://api.example.com".to_owned(),
//!     cache: CacheConfig {
//!         default_ttl: Duration::seconds(30),
//!         ..Default::default()
//!     },
//!     timeouts: TimeoutConfig {
//!         interactive: Duration::seconds(10),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! assert!(config.validate().is_ok());
//! ```

use chrono::Duration;

use crate::ClientError;
use crate::credential::SameSite;

/// Main configuration struct for the session client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend REST API, e.g. `https://api.example.com`.
    pub base_url: String,

    /// Credential lifetime and cookie attributes.
    pub credential: CredentialConfig,

    /// Read cache settings.
    pub cache: CacheConfig,

    /// Per-request timeouts.
    pub timeouts: TimeoutConfig,

    /// Session keep-alive probe.
    pub liveness: LivenessConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            credential: CredentialConfig::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given backend with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Configuration suited to a local backend on another origin.
    ///
    /// Cache TTLs are short so edits show up quickly and the probe runs more
    /// often than in production.
    pub fn development() -> Self {
        Self {
            base_url: "http://localhost:8000".to_owned(),
            credential: CredentialConfig {
                same_site: SameSite::Lax,
                ..Default::default()
            },
            cache: CacheConfig {
                enabled: true,
                default_ttl: Duration::seconds(10),
            },
            timeouts: TimeoutConfig::default(),
            liveness: LivenessConfig {
                interval: Some(Duration::minutes(5)),
                max_consecutive_failures: None,
            },
        }
    }

    /// Configuration with tighter lifetimes.
    ///
    /// Credentials live for 8 hours, cached reads for 15 seconds, and a
    /// session whose probe fails three times in a row is dropped.
    pub fn strict() -> Self {
        Self {
            base_url: "https://localhost".to_owned(),
            credential: CredentialConfig {
                ttl: Duration::hours(8),
                same_site: SameSite::Strict,
                ..Default::default()
            },
            cache: CacheConfig {
                enabled: true,
                default_ttl: Duration::seconds(15),
            },
            timeouts: TimeoutConfig {
                interactive: Duration::seconds(10),
                ..Default::default()
            },
            liveness: LivenessConfig {
                interval: None,
                max_consecutive_failures: Some(3),
            },
        }
    }

    /// Whether requests go over TLS. Drives the cookie `Secure` attribute.
    pub fn is_tls(&self) -> bool {
        self.base_url
            .trim()
            .to_ascii_lowercase()
            .starts_with("https://")
    }

    /// Interval between liveness probes.
    pub fn probe_interval(&self) -> Duration {
        self.liveness
            .interval
            .unwrap_or_else(|| self.credential.ttl / 2)
    }

    /// Checks the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` naming the offending setting.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Configuration("base_url must not be empty".to_owned()));
        }
        if self.credential.ttl <= Duration::zero() {
            return Err(ClientError::Configuration("credential ttl must be positive".to_owned()));
        }
        if self.cache.default_ttl <= Duration::zero() {
            return Err(ClientError::Configuration("cache ttl must be positive".to_owned()));
        }
        if self.timeouts.interactive >= self.timeouts.slow {
            return Err(ClientError::Configuration(
                "interactive timeout must be shorter than the slow timeout".to_owned(),
            ));
        }
        if self.probe_interval() <= Duration::zero() {
            return Err(ClientError::Configuration("probe interval must be positive".to_owned()));
        }
        Ok(())
    }
}

/// Credential lifetime and cookie attributes.
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Name of the cookie holding the bearer token.
    ///
    /// Default: `access_token`
    pub cookie_name: String,

    /// Default: `/`
    pub cookie_path: String,

    /// Fixed lifetime of an issued credential. The client never extends it.
    ///
    /// Default: 1 day
    pub ttl: Duration,

    /// `SameSite` attribute. Use `None` when the frontend and backend are
    /// served from different sites (requires TLS).
    ///
    /// Default: `Lax`
    pub same_site: SameSite,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            cookie_name: "access_token".to_owned(),
            cookie_path: "/".to_owned(),
            ttl: Duration::days(1),
            same_site: SameSite::Lax,
        }
    }
}

/// Read cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every read goes to the network. Invalidation still runs.
    pub enabled: bool,

    /// TTL for cacheable endpoints without their own TTL.
    ///
    /// Default: 60 seconds
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::seconds(60),
        }
    }
}

/// Request timeouts.
///
/// Interactive reads fail fast. Operations known to be slow (initial
/// third-party history sync, payment reconciliation) get a much longer
/// budget.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Default: 15 seconds
    pub interactive: Duration,

    /// Default: 3 minutes
    pub slow: Duration,

    /// Endpoint patterns using the slow timeout, e.g.
    /// `/integrations/{provider}/sync`.
    pub slow_endpoints: Vec<String>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            interactive: Duration::seconds(15),
            slow: Duration::minutes(3),
            slow_endpoints: vec![
                "/integrations/{provider}/sync".to_owned(),
                "/payments/reconcile".to_owned(),
            ],
        }
    }
}

impl TimeoutConfig {
    /// Timeout for a request to `path`.
    pub fn for_path(&self, path: &str) -> Duration {
        let slow = self
            .slow_endpoints
            .iter()
            .any(|pattern| crate::cache::EndpointPattern::parse(pattern).matches(path).is_some());

        if slow { self.slow } else { self.interactive }
    }
}

/// Keep-alive probe settings.
#[derive(Debug, Clone, Default)]
pub struct LivenessConfig {
    /// Interval between probes. `None` means half the credential TTL.
    pub interval: Option<Duration>,

    /// Number of consecutive non-auth probe failures after which the session
    /// is dropped. `None` keeps the session regardless.
    pub max_consecutive_failures: Option<u32>,
}
