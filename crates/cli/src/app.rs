//! Wires config into the long-lived stores shared by every command.

use std::sync::Arc;

use api::{ApiClient, ChatApi};
use auth::{AuthBackend, AuthStore, HttpAuthBackend, MockAuthBackend, ProfileCache};
use chat::{MessageDispatcher, RemoteResponder, Responder, SessionStore, SimulatedResponder};
use navigation::{LoadingCoordinator, Navigator};
use tracing::{debug, info};

use crate::config::{Config, ResponderKind};

/// Process-wide stores and collaborators.
pub struct App {
    pub client: Arc<ApiClient>,
    pub auth: Arc<AuthStore>,
    pub sessions: Arc<SessionStore>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub navigator: Arc<Navigator>,
}

impl App {
    /// Builds every store from `config`. No network traffic happens here.
    pub fn build(config: &Config) -> anyhow::Result<Self> {
        let client = Arc::new(ApiClient::new(config.api_settings())?);

        let (backend, cache): (Arc<dyn AuthBackend>, Option<ProfileCache>) =
            if config.auth.mock_enabled {
                info!(
                    email = %config.auth.mock_user_email,
                    "Mock authentication enabled; the REST backend will not be used"
                );
                let backend = MockAuthBackend::with_identity(
                    &config.auth.mock_user_name,
                    &config.auth.mock_user_email,
                    config.auth.mock_role(),
                );
                (Arc::new(backend), None)
            } else {
                let cache = ProfileCache::new(config.auth.resolved_cache_path());
                (
                    Arc::new(HttpAuthBackend::new(Arc::clone(&client))),
                    Some(cache),
                )
            };
        let auth = Arc::new(AuthStore::new(backend, cache));

        let responder: Arc<dyn Responder> = match config.chat.responder {
            ResponderKind::Simulated => {
                let (min, max) = config.chat.delay_bounds();
                Arc::new(SimulatedResponder::new(min, max))
            }
            ResponderKind::Remote => {
                Arc::new(RemoteResponder::new(ChatApi::new(Arc::clone(&client))))
            }
        };
        let sessions = Arc::new(SessionStore::new());
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&sessions),
            responder,
            config.chat.dispatcher_options(),
        ));

        let loading = Arc::new(LoadingCoordinator::new(
            config.navigation.loading_duration(),
            config.navigation.loading_text.clone(),
        ));
        let navigator = Arc::new(Navigator::new(loading));

        debug!(
            auth_backend = auth.backend_name(),
            responder = config.chat.responder.name(),
            "App assembled"
        );
        Ok(Self {
            client,
            auth,
            sessions,
            dispatcher,
            navigator,
        })
    }

    pub fn chat_api(&self) -> ChatApi {
        ChatApi::new(Arc::clone(&self.client))
    }
}
