//! The federation state machine: initiation, callback validation, code
//! exchange, profile fetch, user reconciliation, and backend token
//! issuance.
//!
//! Every failure short-circuits to a [`FederationError`] whose opaque code
//! ends up in a browser redirect; raw backend or provider diagnostics stay
//! in the server logs. No stage is retried — a failed flow restarts from
//! initiation.

use kb_config::HandoffConfig;
use kb_types::{AppError, AppResult, TokenSet};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::backend::{BackendClient, NewUser};
use crate::google::GoogleClient;
use crate::state::{validate_state, CsrfState};

/// Terminal failure of a federation flow. `code()` is the only part shown
/// to the browser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FederationError {
    #[error("state cookie and callback state are missing or mismatched")]
    InvalidState,

    #[error("state is not valid JSON")]
    InvalidStateFormat,

    #[error("authorization code missing from callback")]
    NoCode,

    #[error("external token exchange failed")]
    TokenExchange,

    #[error("external profile fetch failed")]
    Userinfo,

    #[error("user registration failed")]
    Registration,

    #[error("backend token acquisition failed")]
    TokenAcquisition,

    #[error("login failed")]
    Login,
}

impl FederationError {
    /// Opaque error code carried on the failure redirect.
    pub fn code(&self) -> &'static str {
        match self {
            FederationError::InvalidState => "invalid_state",
            FederationError::InvalidStateFormat => "invalid_state_format",
            FederationError::NoCode => "no_code",
            FederationError::TokenExchange => "token_exchange_failed",
            FederationError::Userinfo => "userinfo_failed",
            FederationError::Registration => "registration_failed",
            FederationError::TokenAcquisition => "token_acquisition_failed",
            FederationError::Login => "login_failed",
        }
    }
}

/// Result of flow initiation: the provider URL to redirect the browser to
/// and the serialized state destined for the single-use cookie.
#[derive(Debug)]
pub struct FlowStart {
    pub auth_url: String,
    pub state: String,
}

/// Result of a completed flow.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Commit the tokens to HttpOnly cookies and send the browser home.
    Committed(TokenSet),

    /// Legacy cross-app handoff: redirect to the caller-supplied target
    /// with the access token as a query parameter. Weaker custody;
    /// only reachable when the handoff mode is enabled.
    Handoff {
        redirect_uri: String,
        tokens: TokenSet,
    },
}

pub struct FederationBridge {
    google: GoogleClient,
    backend: BackendClient,
    handoff: HandoffConfig,
}

impl FederationBridge {
    pub fn new(google: GoogleClient, backend: BackendClient, handoff: HandoffConfig) -> Self {
        Self {
            google,
            backend,
            handoff,
        }
    }

    /// Initiate a flow: mint single-use state and build the provider
    /// authorization URL. A handoff target is only accepted when the
    /// legacy mode is enabled and the target origin is allowlisted.
    pub fn begin(&self, redirect_uri: Option<String>) -> AppResult<FlowStart> {
        if let Some(uri) = &redirect_uri {
            if !self.handoff.enabled {
                return Err(AppError::InvalidParams(
                    "redirect_uri is not supported; cross-app handoff is disabled".to_string(),
                ));
            }
            if !self.handoff_target_allowed(uri) {
                return Err(AppError::InvalidParams(format!(
                    "redirect_uri origin is not allowlisted: {}",
                    uri
                )));
            }
            warn!(target = %uri, "legacy handoff flow initiated");
        }

        let state = CsrfState::mint(redirect_uri);
        let encoded = state.encode()?;
        let auth_url = self.google.authorization_url(&encoded);

        Ok(FlowStart {
            auth_url,
            state: encoded,
        })
    }

    /// Run the callback half of the state machine. The caller must have
    /// already consumed (deleted) the state cookie; its value is passed in
    /// here whether or not it was present.
    pub async fn complete(
        &self,
        code: Option<&str>,
        received_state: Option<&str>,
        cookie_state: Option<&str>,
    ) -> Result<CallbackOutcome, FederationError> {
        let state = validate_state(cookie_state, received_state)?;
        let code = code.ok_or(FederationError::NoCode)?;

        let external_token = self
            .google
            .exchange_code(code)
            .await
            .map_err(|_| FederationError::TokenExchange)?;

        let user = self
            .google
            .fetch_user(&external_token)
            .await
            .map_err(|_| FederationError::Userinfo)?;

        // Reconciliation: register at most once, and only when the backend
        // confirms the email is absent. Existing users proceed silently.
        let exists = self
            .backend
            .user_exists(&user.email)
            .await
            .map_err(|_| FederationError::Registration)?;

        let flow_password = if exists {
            info!(email = %user.email, "user already registered");
            None
        } else {
            let password = kb_utils::crypto::generate_opaque_password()
                .map_err(|_| FederationError::Registration)?;

            let username = user.email.split('@').next().unwrap_or(&user.email);
            self.backend
                .register(&NewUser {
                    username: username.to_string(),
                    email: user.email.clone(),
                    password: password.clone(),
                    full_name: user.name.clone(),
                    google_id: Some(user.sub.clone()),
                    picture: user.picture.clone(),
                })
                .await
                .map_err(|_| FederationError::Registration)?;

            info!(email = %user.email, "registered new federated user");
            Some(password)
        };

        let tokens = match self
            .backend
            .google_grant(&user.email, &user.sub, &external_token)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "federated grant unsupported or rejected, trying password fallback");
                match &flow_password {
                    Some(password) => self
                        .backend
                        .password_grant(&user.email, password)
                        .await
                        .map_err(|_| FederationError::TokenAcquisition)?,
                    // Existing user, no password known in this flow.
                    None => return Err(FederationError::Login),
                }
            }
        };

        info!(email = %user.email, "backend tokens issued for federated login");

        match state.redirect_uri {
            Some(uri) if self.handoff_target_allowed(&uri) => {
                warn!(target = %uri, "legacy handoff: access token leaves via redirect URL");
                Ok(CallbackOutcome::Handoff {
                    redirect_uri: uri,
                    tokens,
                })
            }
            // A target that no longer passes policy (config changed
            // mid-flow, tampered cookie) falls back to cookie custody.
            Some(_) => Ok(CallbackOutcome::Committed(tokens)),
            None => Ok(CallbackOutcome::Committed(tokens)),
        }
    }

    fn handoff_target_allowed(&self, uri: &str) -> bool {
        if !self.handoff.enabled {
            return false;
        }

        let parsed = match Url::parse(uri) {
            Ok(url) => url,
            Err(_) => return false,
        };

        let origin = parsed.origin().ascii_serialization();
        self.handoff
            .allowed_origins
            .iter()
            .any(|allowed| allowed == &origin)
    }
}
