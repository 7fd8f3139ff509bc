//! Process-wide auth state and the operations that move it.

use std::sync::Arc;

use parking_lot::Mutex;
use proto::{
    AuthError, AuthState, LoginCredentials, PasswordUpdate, ProfileUpdate, RegisterData,
    UserProfile,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{AuthBackend, AuthSession};
use crate::cache::{CachedSession, ProfileCache};
use crate::validation;

/// Holds [`AuthState`] and delegates every operation to an [`AuthBackend`].
///
/// `loading` is set for the duration of each operation. Failures leave
/// `is_authenticated` as it was and store the message in `error`; they are
/// also returned to the caller.
pub struct AuthStore {
    backend: Arc<dyn AuthBackend>,
    cache: Option<ProfileCache>,
    token: Mutex<Option<String>>,
    state: watch::Sender<AuthState>,
}

impl AuthStore {
    pub fn new(backend: Arc<dyn AuthBackend>, cache: Option<ProfileCache>) -> Self {
        let (state, _) = watch::channel(AuthState::logged_out());
        Self {
            backend,
            cache,
            token: Mutex::new(None),
            state,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Restores the cached session, if any, and confirms it with the backend.
    ///
    /// When the backend cannot confirm a cached session the cached profile is
    /// used as is.
    pub async fn initialize(&self) -> AuthState {
        self.state.send_modify(|s| s.loading = true);

        let cached = self.cache.as_ref().and_then(ProfileCache::load);
        if let Some(session) = &cached {
            debug!(user_id = %session.user.id, "Restoring cached session");
            self.backend.restore_token(&session.token);
            *self.token.lock() = Some(session.token.clone());
        }

        match self.backend.current_user().await {
            Ok(user) => {
                info!(user_id = %user.id, backend = self.backend.name(), "Session restored");
                self.persist(&user);
                self.state.send_replace(AuthState::authenticated(user));
            }
            Err(e) => match cached {
                Some(session) => {
                    warn!(error = %e, "Could not confirm session; using cached profile");
                    self.state
                        .send_replace(AuthState::authenticated(session.user));
                }
                None => {
                    debug!("No stored session");
                    self.state.send_replace(AuthState::logged_out());
                }
            },
        }
        self.state()
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(), AuthError> {
        self.begin();
        let result = match validation::login(credentials) {
            Ok(()) => self.backend.login(credentials).await,
            Err(e) => Err(e),
        };
        self.settle_sign_in(result)
    }

    pub async fn register(&self, data: &RegisterData) -> Result<(), AuthError> {
        self.begin();
        let result = match validation::register(data) {
            Ok(()) => self.backend.register(data).await,
            Err(e) => Err(e),
        };
        self.settle_sign_in(result)
    }

    /// Always ends logged out, whatever the backend says.
    pub async fn logout(&self) {
        self.begin();
        if let Err(e) = self.backend.logout().await {
            warn!(error = %e, "Remote logout failed; clearing local session anyway");
        }
        *self.token.lock() = None;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.clear()
        {
            warn!(path = %cache.path().display(), error = %e, "Failed to remove session cache");
        }
        info!("Logged out");
        self.state.send_replace(AuthState::logged_out());
    }

    pub async fn update_profile(&self, updates: &ProfileUpdate) -> Result<(), AuthError> {
        self.begin();
        if !self.is_authenticated() {
            return self.fail(AuthError::NotAuthenticated);
        }
        match self.backend.update_profile(updates).await {
            Ok(user) => {
                debug!(user_id = %user.id, "Profile updated");
                self.persist(&user);
                self.state.send_modify(|s| {
                    s.user = Some(user);
                    s.loading = false;
                });
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    pub async fn update_password(&self, data: &PasswordUpdate) -> Result<(), AuthError> {
        self.begin();
        if !self.is_authenticated() {
            return self.fail(AuthError::NotAuthenticated);
        }
        let result = match validation::password_update(data) {
            Ok(()) => self.backend.update_password(data).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                debug!("Password updated");
                self.state.send_modify(|s| s.loading = false);
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    /// Re-fetches the current user.
    ///
    /// Like [`initialize`](Self::initialize), a backend failure falls back to
    /// the cached profile when one exists; without a cache the user is logged
    /// out and the error returned.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.state.send_modify(|s| s.loading = true);
        match self.backend.current_user().await {
            Ok(user) => {
                self.persist(&user);
                self.state.send_replace(AuthState::authenticated(user));
                Ok(())
            }
            Err(e) => match self.cache.as_ref().and_then(ProfileCache::load) {
                Some(session) => {
                    warn!(error = %e, "Session refresh failed; using cached profile");
                    self.state
                        .send_replace(AuthState::authenticated(session.user));
                    Ok(())
                }
                None => {
                    warn!(error = %e, "Session refresh failed");
                    self.state.send_replace(AuthState {
                        error: Some(e.to_string()),
                        ..AuthState::logged_out()
                    });
                    Err(e)
                }
            },
        }
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn fail(&self, err: AuthError) -> Result<(), AuthError> {
        debug!(error = %err, "Auth operation failed");
        self.state.send_modify(|s| {
            s.loading = false;
            s.error = Some(err.to_string());
        });
        Err(err)
    }

    fn settle_sign_in(&self, result: Result<AuthSession, AuthError>) -> Result<(), AuthError> {
        match result {
            Ok(session) => {
                *self.token.lock() = Some(session.token);
                self.persist(&session.user);
                info!(user_id = %session.user.id, "Authenticated");
                self.state
                    .send_replace(AuthState::authenticated(session.user));
                Ok(())
            }
            Err(e) => self.fail(e),
        }
    }

    fn persist(&self, user: &UserProfile) {
        let Some(cache) = &self.cache else {
            return;
        };
        let Some(token) = self.token.lock().clone() else {
            return;
        };
        let session = CachedSession {
            token,
            user: user.clone(),
        };
        if let Err(e) = cache.save(&session) {
            warn!(path = %cache.path().display(), error = %e, "Failed to cache session");
        }
    }
}
