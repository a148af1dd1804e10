//! Client-side input checks run before any request is sent.

mod email;
mod password;
mod token;

use std::fmt;

pub use email::{normalize_email, validate_email};
pub use password::{PasswordPolicy, validate_login_password};
pub use token::validate_invite_token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmailEmpty,
    EmailTooLong,
    EmailInvalidFormat,
    PasswordEmpty,
    PasswordTooShort { min: usize },
    PasswordTooLong { max: usize },
    PasswordMissingLetter,
    PasswordMissingDigit,
    PasswordContainsEmail,
    TokenEmpty,
    TokenMalformed,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailEmpty => write!(f, "Email cannot be empty"),
            Self::EmailTooLong => write!(f, "Email is too long (max 254 characters)"),
            Self::EmailInvalidFormat => write!(f, "Invalid email format"),
            Self::PasswordEmpty => write!(f, "Password cannot be empty"),
            Self::PasswordTooShort { min } => {
                write!(f, "Password must be at least {min} characters")
            }
            Self::PasswordTooLong { max } => {
                write!(f, "Password is too long (max {max} characters)")
            }
            Self::PasswordMissingLetter => write!(f, "Password must contain a letter"),
            Self::PasswordMissingDigit => write!(f, "Password must contain a digit"),
            Self::PasswordContainsEmail => write!(f, "Password must not contain your email"),
            Self::TokenEmpty => write!(f, "Invitation link is missing its token"),
            Self::TokenMalformed => write!(f, "Invitation link is malformed"),
        }
    }
}

impl std::error::Error for ValidationError {}
