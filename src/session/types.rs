use serde::{Deserialize, Serialize};

use crate::permissions::Role;

/// Who the credential acts as, as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    /// Role in `org_id`.
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub org_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    /// The user's role there, when the backend includes it.
    #[serde(default)]
    pub role: Option<Role>,
}

/// `POST /auth/login` request body.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
}

/// `POST /auth/login` response. Either a token, or a request to pick an
/// organization (possibly with a provisional token).
#[derive(Debug, Default, Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub requires_org_selection: bool,
    #[serde(default)]
    pub organizations: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
}
