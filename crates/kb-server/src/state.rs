//! Server state
//!
//! One [`AppState`] built from the configuration at startup and cloned into
//! every handler. No shared mutable state lives here: each request is
//! handled independently, and the only durable state is the browser's
//! cookie jar.

use std::sync::Arc;

use kb_config::AppConfig;
use kb_custody::CookiePolicy;
use kb_federation::{BackendClient, FederationBridge, GoogleClient};
use kb_proxy::Forwarder;
use kb_types::AppResult;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Process configuration, immutable after startup
    pub config: Arc<AppConfig>,

    /// Reverse proxy to the backend token API
    pub forwarder: Arc<Forwarder>,

    /// Google federation bridge
    pub bridge: Arc<FederationBridge>,

    /// Backend client for session endpoints (userinfo read-through,
    /// best-effort revocation, legacy completion)
    pub backend: Arc<BackendClient>,

    /// Cookie issuance policy
    pub cookies: CookiePolicy,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let forwarder = Forwarder::new(
            config.backend.base_url.clone(),
            config.backend.basic_auth.clone(),
        )?;
        let google = GoogleClient::new(config.google.clone())?;
        let backend = BackendClient::new(&config.backend)?;
        let bridge = FederationBridge::new(
            google,
            BackendClient::new(&config.backend)?,
            config.handoff.clone(),
        );
        let cookies = CookiePolicy::new(config.production);

        Ok(Self {
            config: Arc::new(config),
            forwarder: Arc::new(forwarder),
            bridge: Arc::new(bridge),
            backend: Arc::new(backend),
            cookies,
        })
    }
}
