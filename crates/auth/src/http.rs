//! REST auth backend.

use std::sync::Arc;

use api::{ApiClient, endpoints};
use async_trait::async_trait;
use chrono::Utc;
use proto::{
    ApiError, AuthError, LoginCredentials, PasswordUpdate, ProfileUpdate, RegisterData,
    UserProfile, UserRole, UserStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, AuthSession};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SigninForm<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupForm<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    profile_image_url: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateProfileForm<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_image_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timezone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct UpdatePasswordForm<'a> {
    password: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
    name: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    profile_image_url: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

impl UserResponse {
    fn into_profile(self) -> UserProfile {
        let role = self.role.parse::<UserRole>().unwrap_or_else(|_| {
            if !self.role.is_empty() {
                warn!(role = %self.role, "Unknown user role; treating as user");
            }
            UserRole::User
        });
        let now = Utc::now();
        UserProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            avatar: self.profile_image_url.filter(|url| !url.is_empty()),
            bio: self.bio,
            phone: self.phone,
            location: self.location,
            timezone: self.timezone,
            role,
            status: UserStatus::Active,
            created_at: now,
            last_active: now,
        }
    }
}

/// Login/register reply: either `{user, token}` or the user fields inlined
/// next to `token`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SigninResponse {
    Nested {
        user: UserResponse,
        token: String,
    },
    Flat {
        #[serde(flatten)]
        user: UserResponse,
        token: String,
    },
}

impl SigninResponse {
    fn into_session(self) -> AuthSession {
        let (user, token) = match self {
            Self::Nested { user, token } | Self::Flat { user, token } => (user, token),
        };
        AuthSession {
            user: user.into_profile(),
            token,
        }
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// Talks to the `/auth` endpoints through a shared [`ApiClient`]
pub struct HttpAuthBackend {
    client: Arc<ApiClient>,
}

impl HttpAuthBackend {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    fn require_token(&self) -> Result<(), AuthError> {
        if self.client.has_token() {
            Ok(())
        } else {
            Err(AuthError::NotAuthenticated)
        }
    }

    async fn sign_in(&self, path: &str, body: &impl Serialize) -> Result<AuthSession, AuthError> {
        let response: SigninResponse =
            self.client.post(path, body).await.map_err(rejected_credentials)?;
        let session = response.into_session();
        self.client.set_token(session.token.clone());
        Ok(session)
    }
}

/// 401/403 on a sign-in call means the credentials were refused.
fn rejected_credentials(err: ApiError) -> AuthError {
    match err {
        ApiError::Unauthorized(message) => AuthError::InvalidCredentials(message),
        other => AuthError::Api(other),
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn restore_token(&self, token: &str) {
        self.client.set_token(token);
    }

    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        debug!(email = %credentials.email, "Signing in");
        let form = SigninForm {
            email: &credentials.email,
            password: &credentials.password,
        };
        let session = self.sign_in(endpoints::auth::LOGIN, &form).await?;
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn register(&self, data: &RegisterData) -> Result<AuthSession, AuthError> {
        debug!(email = %data.email, "Registering account");
        let form = SignupForm {
            name: &data.name,
            email: &data.email,
            password: &data.password,
            profile_image_url: data.profile_image_url.as_deref().unwrap_or_default(),
        };
        let session = self.sign_in(endpoints::auth::REGISTER, &form).await?;
        info!(user_id = %session.user.id, "Account registered");
        Ok(session)
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let result = self.client.post_empty(endpoints::auth::LOGOUT).await;
        self.client.clear_token();
        result.map_err(AuthError::from)
    }

    async fn current_user(&self) -> Result<UserProfile, AuthError> {
        self.require_token()?;
        let user: UserResponse = self.client.get(endpoints::auth::ME).await?;
        Ok(user.into_profile())
    }

    async fn update_profile(&self, updates: &ProfileUpdate) -> Result<UserProfile, AuthError> {
        self.require_token()?;
        let form = UpdateProfileForm {
            name: updates.name.as_deref(),
            profile_image_url: updates.avatar_url.as_deref(),
            bio: updates.bio.as_deref(),
            phone: updates.phone.as_deref(),
            location: updates.location.as_deref(),
            timezone: updates.timezone.as_deref(),
        };
        let user: UserResponse = self.client.patch(endpoints::auth::PROFILE, &form).await?;
        Ok(user.into_profile())
    }

    async fn update_password(&self, data: &PasswordUpdate) -> Result<(), AuthError> {
        self.require_token()?;
        let form = UpdatePasswordForm {
            password: &data.current_password,
            new_password: &data.new_password,
        };
        self.client
            .patch_no_content(endpoints::auth::PASSWORD, &form)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use api::ApiSettings;

    use super::*;

    #[test]
    fn signin_response_accepts_nested_and_flat_shapes() {
        let nested: SigninResponse = serde_json::from_str(
            r#"{"user":{"id":"u1","email":"a@b.c","name":"A","role":"admin"},"token":"t1"}"#,
        )
        .expect("nested");
        let flat: SigninResponse = serde_json::from_str(
            r#"{"id":"u1","email":"a@b.c","name":"A","role":"admin","profile_image_url":"","token":"t1","token_type":"Bearer"}"#,
        )
        .expect("flat");

        let a = nested.into_session();
        let b = flat.into_session();
        assert_eq!(a.token, "t1");
        assert_eq!(b.token, "t1");
        assert_eq!(a.user.role, UserRole::Admin);
        assert_eq!(b.user.email, "a@b.c");
        assert!(b.user.avatar.is_none());
    }

    #[test]
    fn unknown_role_falls_back_to_user() {
        let user = UserResponse {
            id: "u".to_string(),
            email: "e".to_string(),
            name: "n".to_string(),
            role: "superhero".to_string(),
            profile_image_url: None,
            bio: None,
            phone: None,
            location: None,
            timezone: None,
        };
        assert_eq!(user.into_profile().role, UserRole::User);
    }

    #[test]
    fn unauthorized_sign_in_maps_to_invalid_credentials() {
        let err = rejected_credentials(ApiError::Unauthorized("Wrong password".to_string()));
        assert_eq!(err, AuthError::InvalidCredentials("Wrong password".to_string()));
        let err = rejected_credentials(ApiError::Network("refused".to_string()));
        assert!(matches!(err, AuthError::Api(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn token_bound_calls_fail_locally_without_token() {
        let client = Arc::new(ApiClient::new(ApiSettings::new("http://127.0.0.1:9")).expect("client"));
        let backend = HttpAuthBackend::new(client);
        assert_eq!(
            backend.current_user().await,
            Err(AuthError::NotAuthenticated)
        );
        assert_eq!(
            backend.update_password(&PasswordUpdate::default()).await,
            Err(AuthError::NotAuthenticated)
        );
    }
}
