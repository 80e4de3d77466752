//! Configuration management
//!
//! Builds one immutable [`AppConfig`] from the environment at process start.
//! Derived values (the Google redirect URI, the backend Basic-auth header)
//! are computed here, in the constructor, and nowhere else.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use kb_types::{AppError, AppResult};
use tracing::{info, warn};

mod types;

pub use types::*;

/// Process-wide configuration, constructed once and injected into each
/// component. Components never read ambient environment state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub google: GoogleConfig,

    /// Public base URL this service is reachable at (no trailing slash)
    pub public_url: String,

    /// Production-like deployment: cookies carry the `Secure` flag
    pub production: bool,

    pub handoff: HandoffConfig,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_flag(key: &str) -> bool {
    matches!(
        env_opt(key).as_deref(),
        Some("1") | Some("true") | Some("yes")
    )
}

impl AppConfig {
    /// Load configuration from the environment.
    ///
    /// Environment variables:
    /// * `KB_HOST`, `KB_PORT`, `KB_ENABLE_CORS` — listener
    /// * `KB_AUTH_API_URL` — token backend base URL
    /// * `KB_BACKEND_CLIENT_ID`, `KB_BACKEND_CLIENT_SECRET` — service client
    /// * `KB_GOOGLE_CLIENT_ID`, `KB_GOOGLE_CLIENT_SECRET` — provider client
    /// * `KB_PUBLIC_URL` — public base URL of this service
    /// * `KB_PRODUCTION` — secure-cookie mode
    /// * `KB_HANDOFF_ENABLED`, `KB_HANDOFF_ALLOWED_ORIGINS` — legacy handoff
    pub fn from_env() -> AppResult<Self> {
        let public_url = env_or("KB_PUBLIC_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let google_client_id = env_opt("KB_GOOGLE_CLIENT_ID")
            .ok_or_else(|| AppError::Config("KB_GOOGLE_CLIENT_ID is not set".to_string()))?;
        let google_client_secret = env_opt("KB_GOOGLE_CLIENT_SECRET")
            .ok_or_else(|| AppError::Config("KB_GOOGLE_CLIENT_SECRET is not set".to_string()))?;

        let port = env_or("KB_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| AppError::Config(format!("KB_PORT is not a valid port: {}", e)))?;

        let handoff = HandoffConfig {
            enabled: env_flag("KB_HANDOFF_ENABLED"),
            allowed_origins: env_opt("KB_HANDOFF_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().trim_end_matches('/').to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        if handoff.enabled {
            warn!(
                allowed_origins = ?handoff.allowed_origins,
                "legacy token handoff mode is enabled; issued access tokens \
                 will appear in redirect URLs for allowlisted origins"
            );
        }

        let config = Self {
            server: ServerConfig {
                host: env_or("KB_HOST", "127.0.0.1"),
                port,
                enable_cors: env_flag("KB_ENABLE_CORS"),
            },
            backend: BackendConfig::new(
                env_or("KB_AUTH_API_URL", "http://localhost:8000"),
                env_opt("KB_BACKEND_CLIENT_ID"),
                env_opt("KB_BACKEND_CLIENT_SECRET"),
            ),
            google: GoogleConfig::new(google_client_id, google_client_secret, &public_url),
            public_url,
            production: env_flag("KB_PRODUCTION"),
            handoff,
        };

        info!(
            backend = %config.backend.base_url,
            public_url = %config.public_url,
            production = config.production,
            "configuration loaded"
        );

        Ok(config)
    }
}

impl BackendConfig {
    /// Build the backend config, precomputing the Basic-auth header when
    /// both client credentials are present.
    pub fn new(base_url: String, client_id: Option<String>, client_secret: Option<String>) -> Self {
        let basic_auth = match (&client_id, &client_secret) {
            (Some(id), Some(secret)) => Some(format!(
                "Basic {}",
                BASE64.encode(format!("{}:{}", id, secret))
            )),
            _ => {
                warn!("backend client credentials not configured; token, revoke and register calls will carry no Authorization header");
                None
            }
        };

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
            basic_auth,
        }
    }
}

impl GoogleConfig {
    /// Build the provider config. The redirect URI is derived from the
    /// public base URL exactly once, here.
    pub fn new(client_id: String, client_secret: String, public_url: &str) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri: format!("{}/api/auth/google/callback", public_url),
            auth_url: env_or("KB_GOOGLE_AUTH_URL", DEFAULT_GOOGLE_AUTH_URL),
            token_url: env_or("KB_GOOGLE_TOKEN_URL", DEFAULT_GOOGLE_TOKEN_URL),
            userinfo_url: env_or("KB_GOOGLE_USERINFO_URL", DEFAULT_GOOGLE_USERINFO_URL),
        }
    }
}
