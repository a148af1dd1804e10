use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Rules a new identity's password must satisfy before an invitation is
/// accepted with it.
///
/// ```
/// use orgsession::validators::PasswordPolicy;
///
/// let policy = PasswordPolicy::default();
/// assert!(policy.validate("longenough1").is_ok());
/// assert!(policy.validate("short").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum length in characters (default: 8)
    pub min_length: usize,
    /// Maximum length in characters (default: 128)
    pub max_length: usize,
    pub require_letter: bool,
    pub require_digit: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_letter: false,
            require_digit: false,
        }
    }
}

impl PasswordPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 10+ characters mixing letters and digits.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            min_length: 10,
            max_length: 128,
            require_letter: true,
            require_digit: true,
        }
    }

    #[must_use]
    pub fn min(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    #[must_use]
    pub fn max(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// Validates a password against this policy.
    ///
    /// # Errors
    ///
    /// Returns the first rule the password breaks.
    pub fn validate(&self, password: &str) -> Result<(), ValidationError> {
        if password.is_empty() {
            return Err(ValidationError::PasswordEmpty);
        }

        let len = password.chars().count();
        if len < self.min_length {
            return Err(ValidationError::PasswordTooShort {
                min: self.min_length,
            });
        }
        if len > self.max_length {
            return Err(ValidationError::PasswordTooLong {
                max: self.max_length,
            });
        }

        if self.require_letter && !password.chars().any(char::is_alphabetic) {
            return Err(ValidationError::PasswordMissingLetter);
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::PasswordMissingDigit);
        }

        Ok(())
    }
}

impl PasswordPolicy {
    /// [`validate`](Self::validate), and also refuses a password built
    /// around the local part of `email`.
    ///
    /// # Errors
    ///
    /// As `validate`, plus `PasswordContainsEmail`.
    pub fn validate_for(&self, password: &str, email: Option<&str>) -> Result<(), ValidationError> {
        self.validate(password)?;

        let local = email
            .and_then(|email| email.trim().split('@').next())
            .map(str::to_lowercase)
            .filter(|local| local.chars().count() >= 3);
        if let Some(local) = local {
            if password.to_lowercase().contains(&local) {
                return Err(ValidationError::PasswordContainsEmail);
            }
        }
        Ok(())
    }
}

/// Login only needs a non-blank password; strength is the server's business.
pub fn validate_login_password(password: &str) -> Result<(), ValidationError> {
    if password.trim().is_empty() {
        return Err(ValidationError::PasswordEmpty);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PasswordPolicy::default();
        assert!(policy.validate("longenough1").is_ok());
        assert!(policy.validate("12345678").is_ok());
        assert_eq!(policy.validate("").unwrap_err(), ValidationError::PasswordEmpty);
        assert_eq!(
            policy.validate("1234567").unwrap_err(),
            ValidationError::PasswordTooShort { min: 8 }
        );
        assert_eq!(
            policy.validate(&"a".repeat(129)).unwrap_err(),
            ValidationError::PasswordTooLong { max: 128 }
        );
    }

    #[test]
    fn test_length_counts_characters() {
        // 8 characters, 16 bytes
        assert!(PasswordPolicy::default().validate("ééééééé1").is_ok());
    }

    #[test]
    fn test_strict_policy() {
        let policy = PasswordPolicy::strict();

        assert!(policy.validate("longenough12").is_ok());
        assert_eq!(
            policy.validate("1234567890").unwrap_err(),
            ValidationError::PasswordMissingLetter
        );
        assert_eq!(
            policy.validate("onlyletters").unwrap_err(),
            ValidationError::PasswordMissingDigit
        );
    }

    #[test]
    fn test_email_local_part_is_refused() {
        let policy = PasswordPolicy::default();

        assert_eq!(
            policy
                .validate_for("Founder2024", Some("founder@startup.test"))
                .unwrap_err(),
            ValidationError::PasswordContainsEmail
        );
        assert!(policy
            .validate_for("longenough1", Some("founder@startup.test"))
            .is_ok());
        // too short a local part to mean anything
        assert!(policy.validate_for("joeblogs99", Some("jo@x.io")).is_ok());
        assert!(policy.validate_for("longenough1", None).is_ok());
    }

    #[test]
    fn test_builder() {
        let policy = PasswordPolicy::new().min(4).max(6);
        assert!(policy.validate("abcd").is_ok());
        assert!(policy.validate("abcdefg").is_err());
    }

    #[test]
    fn test_login_password() {
        assert!(validate_login_password("x").is_ok());
        assert_eq!(
            validate_login_password("   ").unwrap_err(),
            ValidationError::PasswordEmpty
        );
    }
}
