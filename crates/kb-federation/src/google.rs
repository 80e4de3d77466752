//! Google OAuth2 client: authorization URL assembly, authorization-code
//! exchange, and profile fetch.

use kb_config::GoogleConfig;
use kb_types::{AppError, AppResult, GoogleUser};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

/// Outbound request timeout for provider calls
const PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Token response from the provider's token endpoint
#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

pub struct GoogleClient {
    client: Client,
    config: GoogleConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build the authorization URL the browser is redirected to, with the
    /// serialized CSRF state echoed as the `state` parameter.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode("openid email profile"),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for the provider's access token. The
    /// redirect URI must match the one used at initiation bit-for-bit.
    pub async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::ExternalExchange(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "provider token exchange failed");
            return Err(AppError::ExternalExchange(format!(
                "Token exchange failed with status {}",
                status
            )));
        }

        let tokens: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalExchange(format!("Unreadable token response: {}", e)))?;

        debug!("provider token exchange succeeded");
        Ok(tokens.access_token)
    }

    /// Fetch the external identity with the provider's bearer token.
    pub async fn fetch_user(&self, access_token: &str) -> AppResult<GoogleUser> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::ExternalExchange(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            error!(%status, "provider userinfo fetch failed");
            return Err(AppError::ExternalExchange(format!(
                "Userinfo fetch failed with status {}",
                status
            )));
        }

        response
            .json::<GoogleUser>()
            .await
            .map_err(|e| AppError::ExternalExchange(format!("Unreadable userinfo response: {}", e)))
    }
}
