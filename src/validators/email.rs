use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

const MAX_EMAIL_LEN: usize = 254;

#[allow(clippy::unwrap_used)]
static LOCAL_PART: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9._%+-]{1,64}$").unwrap());

// dotted labels ending in an alphabetic TLD
#[allow(clippy::unwrap_used)]
static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
});

/// Trims and lowercases an address typed into the login or invitation form,
/// then checks its shape.
///
/// # Errors
///
/// `EmailEmpty`, `EmailTooLong` or `EmailInvalidFormat`.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ValidationError::EmailEmpty);
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::EmailTooLong);
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };
    if !LOCAL_PART.is_match(local) || !DOMAIN.is_match(domain) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(email)
}

/// Shape check only; see [`normalize_email`].
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    normalize_email(email).map(|_| ())
}
