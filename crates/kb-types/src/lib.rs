//! Shared types for Keybridge: bearer credentials, external identities,
//! and the error taxonomy used across crates.

pub mod errors;

pub use errors::{AppError, AppResult};

use serde::{Deserialize, Serialize};

/// Token response from the backend token endpoint
///
/// The canonical bearer-credential shape: an opaque access token plus an
/// optional refresh token and expiry hint. Custody rules (where these are
/// allowed to live) are owned by `kb-custody`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token
    pub access_token: String,

    /// Refresh token (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Expires in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Token type (usually "Bearer")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Granted scope (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Profile returned by the external identity provider's userinfo endpoint.
///
/// Used only to drive user reconciliation during a federation flow; never
/// persisted by this system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleUser {
    /// Stable subject identifier assigned by the provider
    pub sub: String,

    /// Verified email address
    pub email: String,

    /// Display name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Profile picture URL (optional)
    #[serde(default)]
    pub picture: Option<String>,
}
