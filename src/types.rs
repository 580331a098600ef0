use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Stable backend-issued user identifier (opaque string).
///
/// The backend chooses the format; the client never inspects it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Account role.
///
/// The classification is closed and two-way: anything the backend reports
/// other than `"dietitian"` (including a missing or null role) is a standard
/// user. Roles are assigned by the backend and never change client-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "Option<String>")]
pub enum Role {
    #[default]
    User,
    Dietitian,
}

impl From<Option<String>> for Role {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("dietitian") => Self::Dietitian,
            _ => Self::User,
        }
    }
}

impl Role {
    #[must_use]
    pub fn is_dietitian(self) -> bool {
        self == Self::Dietitian
    }
}

/// The authenticated user's profile projection.
///
/// `email` is optional because phone-only accounts exist; `phone_verified`
/// is tri-state (unknown, false, true).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub phone_verified: Option<bool>,
}

impl Identity {
    #[must_use]
    pub fn is_dietitian(&self) -> bool {
        self.role.is_dietitian()
    }
}

/// A backend-issued credential proving continued authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry instant; seconds since the Unix epoch on the wire.
    #[serde(default, with = "time::serde::timestamp::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    /// Session with only an access token, as returned by the boot-time
    /// session probe.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }
}
