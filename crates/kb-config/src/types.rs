//! Configuration types
//!
//! Every value the mediator needs is resolved once at process start and
//! carried in these structs; business logic never reads the environment.

use serde::{Deserialize, Serialize};

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_cors: false,
        }
    }
}

/// First-party token backend: base URL plus the client credentials used for
/// service-to-service Basic auth on token/revoke/register calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the token-issuing backend, no trailing slash
    pub base_url: String,

    /// OAuth2 client id registered with the backend
    pub client_id: Option<String>,

    /// OAuth2 client secret registered with the backend
    pub client_secret: Option<String>,

    /// Precomputed `Basic <base64(id:secret)>` header value; `None` when
    /// client credentials are not configured (non-fatal, logged per request)
    #[serde(skip)]
    pub basic_auth: Option<String>,
}

/// External identity provider (Google) endpoints and credentials.
///
/// The endpoint URLs default to Google's public endpoints and are
/// overridable so tests can point the bridge at a stub provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,

    /// Callback URL registered with the provider. Computed once from the
    /// public base URL; the code exchange must echo it bit-for-bit.
    pub redirect_uri: String,

    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Legacy cross-app handoff mode: propagating the issued access token as a
/// redirect query parameter. Materially weaker custody than HttpOnly
/// cookies; off by default and origin-allowlisted when on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandoffConfig {
    pub enabled: bool,

    /// Origins (`scheme://host[:port]`) permitted as handoff targets
    pub allowed_origins: Vec<String>,
}

pub const DEFAULT_GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
