//! Auth collaborator abstraction.

use async_trait::async_trait;
use proto::{
    AuthError, LoginCredentials, PasswordUpdate, ProfileUpdate, RegisterData, UserProfile,
};

/// User and bearer token returned by login/register
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
}

/// Remote identity provider behind [`AuthStore`](crate::AuthStore)
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Reuses a token obtained by an earlier process.
    fn restore_token(&self, _token: &str) {}

    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError>;

    async fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError>;

    /// Invalidates the remote session and forgets the local token.
    async fn logout(&self) -> Result<(), AuthError>;

    async fn current_user(&self) -> Result<UserProfile, AuthError>;

    async fn update_profile(&self, updates: &ProfileUpdate) -> Result<UserProfile, AuthError>;

    async fn update_password(&self, data: &PasswordUpdate) -> Result<(), AuthError>;
}
