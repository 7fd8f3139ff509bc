//! Development bypass: a fixed profile, no network.

use async_trait::async_trait;
use parking_lot::RwLock;
use proto::{
    AuthError, LoginCredentials, PasswordUpdate, ProfileUpdate, RegisterData, UserProfile,
    UserRole,
};
use tracing::info;

use crate::backend::{AuthBackend, AuthSession};

pub const MOCK_USER_ID: &str = "dev-user-1";
pub const MOCK_TOKEN: &str = "mock-dev-token";

/// Accepts every request and answers with a static fabricated profile
pub struct MockAuthBackend {
    profile: RwLock<UserProfile>,
}

impl MockAuthBackend {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: RwLock::new(profile),
        }
    }

    pub fn with_identity(name: &str, email: &str, role: UserRole) -> Self {
        Self::new(UserProfile::new(MOCK_USER_ID, name, email, role))
    }

    fn session(&self) -> AuthSession {
        AuthSession {
            user: self.profile.read().clone(),
            token: MOCK_TOKEN.to_string(),
        }
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        info!(email = %credentials.email, "Mock auth: login bypassed");
        Ok(self.session())
    }

    async fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError> {
        info!(email = %data.email, "Mock auth: registration bypassed");
        Ok(self.session())
    }

    async fn logout(&self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn current_user(&self) -> Result<UserProfile, AuthError> {
        Ok(self.profile.read().clone())
    }

    async fn update_profile(&self, updates: &ProfileUpdate) -> Result<UserProfile, AuthError> {
        let mut profile = self.profile.write();
        if let Some(name) = &updates.name {
            profile.name = name.clone();
        }
        if let Some(url) = &updates.avatar_url {
            profile.avatar = Some(url.clone());
        }
        if updates.bio.is_some() {
            profile.bio = updates.bio.clone();
        }
        if updates.phone.is_some() {
            profile.phone = updates.phone.clone();
        }
        if updates.location.is_some() {
            profile.location = updates.location.clone();
        }
        if updates.timezone.is_some() {
            profile.timezone = updates.timezone.clone();
        }
        Ok(profile.clone())
    }

    async fn update_password(&self, _data: &PasswordUpdate) -> Result<(), AuthError> {
        Ok(())
    }
}
