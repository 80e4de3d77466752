//! Session controller: the client-side counterpart of the mediator.
//!
//! Decides where the current credential comes from (cookie-backed session,
//! explicit bearer, or nothing), attaches it to user-info and logout
//! calls, and clears local state when the session ends — whether by
//! explicit logout or by the server answering 401.

use kb_types::{AppError, AppResult, TokenSet};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

const CLIENT_TIMEOUT_SECS: u64 = 30;

/// Where the controller reads the current credential from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// HttpOnly cookies managed by the mediator; the client never sees the
    /// token, the cookie store carries it.
    CookieSession,

    /// An explicit bearer token, e.g. obtained through the legacy handoff.
    Bearer(String),

    /// No credential; user-info calls will come back 401.
    Anonymous,
}

/// Client-side session state against a Keybridge deployment.
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    credential: CredentialSource,
}

impl SessionClient {
    /// Cookie-session client: credentials live in the HttpOnly cookie
    /// store attached to this client.
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential: CredentialSource::CookieSession,
        })
    }

    /// Bearer-mode client for the legacy handoff: the token was received
    /// via a redirect URL and is attached explicitly.
    pub fn with_bearer(base_url: &str, token: String) -> AppResult<Self> {
        let mut client = Self::new(base_url)?;
        client.credential = CredentialSource::Bearer(token);
        Ok(client)
    }

    pub fn credential(&self) -> &CredentialSource {
        &self.credential
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn attach(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            CredentialSource::Bearer(token) => builder.bearer_auth(token),
            // Cookie store or nothing; no header either way.
            CredentialSource::CookieSession | CredentialSource::Anonymous => builder,
        }
    }

    /// Fetch the current user's profile through the read-through endpoint.
    /// A 401 means the session has expired: the local credential hint is
    /// cleared and `None` is returned.
    pub async fn current_user(&mut self) -> AppResult<Option<Value>> {
        let response = self
            .attach(self.http.get(self.url("/api/me")))
            .send()
            .await
            .map_err(|e| AppError::Proxy(format!("User info request failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                debug!("session expired; clearing local credential");
                self.credential = CredentialSource::Anonymous;
                Ok(None)
            }
            status if status.is_success() => {
                let profile = response.json::<Value>().await.map_err(|e| {
                    AppError::Proxy(format!("Unreadable user info response: {}", e))
                })?;
                Ok(Some(profile))
            }
            status => Err(AppError::Proxy(format!(
                "User info request failed with status {}",
                status
            ))),
        }
    }

    /// Read the current access token from the mediator. `None` when no
    /// session cookie is present.
    pub async fn get_token(&self) -> AppResult<Option<String>> {
        let response = self
            .http
            .get(self.url("/api/auth/getToken"))
            .send()
            .await
            .map_err(|e| AppError::Proxy(format!("Token request failed: {}", e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Proxy(format!("Unreadable token response: {}", e)))?;

        Ok(body
            .get("token")
            .and_then(|t| t.as_str())
            .map(|t| t.to_string()))
    }

    /// End the session. The server is notified best-effort; local state is
    /// cleared no matter what.
    pub async fn logout(&mut self) {
        let result = self
            .attach(self.http.post(self.url("/api/logout")))
            .send()
            .await;

        if let Err(e) = result {
            warn!(error = %e, "logout notification failed; clearing local state anyway");
        }

        self.credential = CredentialSource::Anonymous;
    }

    /// Refresh the session through the proxy's token endpoint.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenSet> {
        let response = self
            .http
            .post(self.url("/api/auth/oauth2/token"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::Proxy(format!("Refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::BackendToken(format!(
                "Token refresh failed with status {}",
                response.status()
            )));
        }

        response
            .json::<TokenSet>()
            .await
            .map_err(|e| AppError::Proxy(format!("Unreadable refresh response: {}", e)))
    }

    /// Revoke a token through the proxy's revoke endpoint.
    pub async fn revoke(&self, token: &str, token_type_hint: &str) -> AppResult<()> {
        let response = self
            .http
            .post(self.url("/api/auth/oauth2/revoke"))
            .form(&[("token", token), ("token_type_hint", token_type_hint)])
            .send()
            .await
            .map_err(|e| AppError::Proxy(format!("Revocation request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::BackendToken(format!(
                "Token revocation failed with status {}",
                response.status()
            )));
        }

        Ok(())
    }
}
