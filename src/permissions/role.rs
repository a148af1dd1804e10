use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role within one organization, ordered `Member < Admin < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Role {
    #[default]
    Member,
    Admin,
    Owner,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Strict parse of an already-normalized role name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Lenient parse of whatever the backend sent: trimmed, case-insensitive,
    /// anything unrecognized is `Member`.
    pub fn normalize(raw: &str) -> Self {
        Self::from_str(&raw.trim().to_ascii_lowercase()).unwrap_or(Self::Member)
    }

    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map_or(Self::Member, Self::normalize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Role::Member < Role::Admin);
        assert!(Role::Admin < Role::Owner);
        assert!(Role::Owner.at_least(Role::Admin));
        assert!(!Role::Member.at_least(Role::Admin));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(Role::normalize(" Owner "), Role::Owner);
        assert_eq!(Role::normalize("ADMIN"), Role::Admin);
        assert_eq!(Role::normalize("superuser"), Role::Member);
        assert_eq!(Role::normalize(""), Role::Member);
    }

    #[test]
    fn test_deserialize_is_lenient() {
        let role: Role = serde_json::from_str("\" Admin\"").unwrap();
        assert_eq!(role, Role::Admin);

        let role: Role = serde_json::from_str("null").unwrap();
        assert_eq!(role, Role::Member);

        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
    }
}
