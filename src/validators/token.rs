use super::ValidationError;

/// Rejects invitation tokens that cannot have come from an invitation link.
///
/// This only saves a round trip; the server is the authority on validity.
pub fn validate_invite_token(token: &str) -> Result<(), ValidationError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ValidationError::TokenEmpty);
    }
    if token.len() > 512 || !token.chars().all(|c| c.is_ascii_alphanumeric() || "-_.~".contains(c)) {
        return Err(ValidationError::TokenMalformed);
    }
    Ok(())
}
