//! User identity, auth request payloads, and the process-wide auth state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
    /// Registered but not yet approved.
    Pending,
}

impl std::str::FromStr for UserRole {
    type Err = crate::error::ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "pending" => Ok(Self::Pending),
            other => Err(crate::error::ProtoError::InvalidRole(other.to_string())),
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

/// Profile of the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    /// Builds an active profile with only identity fields populated.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        role: UserRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            avatar: None,
            bio: None,
            phone: None,
            location: None,
            timezone: None,
            role,
            status: UserStatus::Active,
            created_at: now,
            last_active: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Login form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            remember_me: false,
        }
    }
}

/// Registration form input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Password change input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PasswordUpdate {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Process-wide authentication state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub user: Option<UserProfile>,
    /// True while an auth operation is in flight.
    pub loading: bool,
    /// Last user-visible failure, cleared when the next operation starts.
    pub error: Option<String>,
}

impl AuthState {
    /// Logged-in state for `user`.
    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    /// Logged-out state with no pending work.
    pub fn logged_out() -> Self {
        Self::default()
    }
}
