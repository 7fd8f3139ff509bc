use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use api::{ApiSettings, DEFAULT_PREFIX, DEFAULT_TIMEOUT_MS};
use chat::{DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS, DispatcherOptions};
use proto::{ConfigError, DEFAULT_LOADING_TEXT, UserRole};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LOADING_DURATION_MS: u64 = 800;

/// Top-level CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// REST collaborator connection.
    #[serde(default)]
    pub api: ApiConfig,

    /// Auth backend selection and session cache.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Dispatcher and responder tuning.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Page-transition loading indicator.
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// REST collaborator connection config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub prefix: String,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Auth config. `mock_enabled` swaps the REST backend for a fabricated
/// development identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mock_enabled: bool,
    pub mock_user_name: String,
    pub mock_user_email: String,
    pub mock_user_role: String,
    /// `~` expands to `$HOME`.
    pub cache_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mock_enabled: false,
            mock_user_name: "Development User".to_string(),
            mock_user_email: "dev@vikki.vn".to_string(),
            mock_user_role: "admin".to_string(),
            cache_path: "~/.vikki/session.toml".to_string(),
        }
    }
}

impl AuthConfig {
    /// Configured mock role; unknown values fall back to `user`.
    pub fn mock_role(&self) -> UserRole {
        UserRole::from_str(&self.mock_user_role).unwrap_or_else(|e| {
            warn!(role = %self.mock_user_role, "Unknown mock role ({e}), using user");
            UserRole::User
        })
    }

    /// Cache file path with a leading `~` expanded.
    pub fn resolved_cache_path(&self) -> PathBuf {
        expand_home(&self.cache_path)
    }
}

/// Which responder answers chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderKind {
    /// Canned replies after a random delay.
    #[default]
    Simulated,
    /// The remote chat completion endpoint.
    Remote,
}

impl ResponderKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::Remote => "remote",
        }
    }
}

impl FromStr for ResponderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" => Ok(Self::Simulated),
            "remote" => Ok(Self::Remote),
            other => Err(ConfigError::InvalidValue {
                field: "chat.responder".to_string(),
                reason: format!("unknown responder '{other}'"),
            }),
        }
    }
}

/// Dispatcher and responder config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub responder: ResponderKind,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// `0` waits on the responder forever.
    pub response_timeout_secs: u64,
    pub send_on_create: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            responder: ResponderKind::Simulated,
            min_delay_ms: DEFAULT_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT_SECS,
            send_on_create: false,
        }
    }
}

impl ChatConfig {
    pub fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            send_on_create: self.send_on_create,
            response_timeout: (self.response_timeout_secs > 0)
                .then(|| Duration::from_secs(self.response_timeout_secs)),
        }
    }

    pub fn delay_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

/// Loading indicator config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub loading_duration_ms: u64,
    pub loading_text: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            loading_duration_ms: DEFAULT_LOADING_DURATION_MS,
            loading_text: DEFAULT_LOADING_TEXT.to_string(),
        }
    }
}

impl NavigationConfig {
    pub fn loading_duration(&self) -> Duration {
        Duration::from_millis(self.loading_duration_ms)
    }
}

impl Config {
    /// Loads configuration from explicit path, fallback locations, and env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = path.map(|p| p.to_path_buf()).or_else(|| {
            // Look in current dir, then home dir
            let cwd = std::env::current_dir().ok()?.join("config.toml");
            if cwd.exists() {
                return Some(cwd);
            }
            let home = std::env::var("HOME").ok()?;
            let home_config = PathBuf::from(home).join(".vikki").join("config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
            None
        });
        debug!(path = ?config_path, "Config file resolved");

        let mut config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(&path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(|e| ConfigError::Toml(e.to_string()))?
        } else {
            Config::default()
        };

        config.apply_env()?;
        config.validate()?;

        debug!(
            base_url = %config.api.base_url,
            mock_auth = config.auth.mock_enabled,
            responder = config.chat.responder.name(),
            "Config loaded"
        );
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("VIKKI_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(raw) = std::env::var("VIKKI_API_TIMEOUT") {
            self.api.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "VIKKI_API_TIMEOUT".to_string(),
                reason: format!("'{raw}' is not a number of milliseconds"),
            })?;
        }
        if let Ok(flag) = std::env::var("VIKKI_ENABLE_MOCK_AUTH") {
            self.auth.mock_enabled = parse_flag(&flag);
        }
        if let Ok(name) = std::env::var("VIKKI_MOCK_USER_NAME") {
            self.auth.mock_user_name = name;
        }
        if let Ok(email) = std::env::var("VIKKI_MOCK_USER_EMAIL") {
            self.auth.mock_user_email = email;
        }
        if let Ok(role) = std::env::var("VIKKI_MOCK_USER_ROLE") {
            self.auth.mock_user_role = role;
        }
        if let Ok(kind) = std::env::var("VIKKI_RESPONDER") {
            self.chat.responder = kind.parse()?;
        }
        Ok(())
    }

    /// Rejects values the rest of the app cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("api.base_url".to_string()));
        }
        if self.auth.mock_enabled && self.auth.mock_user_email.trim().is_empty() {
            return Err(ConfigError::MissingField("auth.mock_user_email".to_string()));
        }
        if self.chat.min_delay_ms > self.chat.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "chat.min_delay_ms".to_string(),
                reason: format!(
                    "{} is greater than max_delay_ms {}",
                    self.chat.min_delay_ms, self.chat.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api.base_url.clone(),
            prefix: self.api.prefix.clone(),
            timeout: Duration::from_millis(self.api.timeout_ms),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(path)
}
