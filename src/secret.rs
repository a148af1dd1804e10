//! Sensitive data wrapper types.
//!
//! Bearer tokens, passwords and invitation tokens all travel through this
//! crate as [`SecretString`] so they cannot end up in a log line by accident.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string that refuses to print itself.
///
/// `Debug` and `Display` both render `[REDACTED]`. The value is only reachable
/// through [`SecretString::expose_secret`], or through serialization, because
/// request bodies and the persisted credential need the real value.
///
/// # Example
///
/// ```rust
/// use orgsession::SecretString;
///
/// let token = SecretString::new("eyJhbGciOi");
///
/// assert_eq!(format!("{:?}", token), "SecretString([REDACTED])");
/// assert_eq!(token.expose_secret(), "eyJhbGciOi");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the secret value.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// First characters of the secret, for correlating log lines.
    #[must_use]
    pub(crate) fn fingerprint(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{prefix}...")
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}
