//! Google federation routes: flow initiation, the provider callback, and
//! the legacy client-driven completion endpoint.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use kb_federation::{CallbackOutcome, NewUser};
use kb_types::AppError;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use url::Url;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub redirect_uri: Option<String>,
}

/// GET /api/auth/google/login — initiate the federation flow.
///
/// Mints single-use CSRF state, stores it in a short-lived HttpOnly
/// cookie, and redirects the browser to the provider with the same state
/// echoed as the `state` query parameter.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Response {
    match state.bridge.begin(query.redirect_uri) {
        Ok(start) => {
            let jar = state.cookies.stash_state(jar, start.state);
            (jar, Redirect::temporary(&start.auth_url)).into_response()
        }
        Err(AppError::InvalidParams(message)) => {
            warn!(message, "rejected login initiation");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to initiate federation flow");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to initiate login" })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET /api/auth/google/callback — the provider sent the browser back.
///
/// The state cookie is consumed (deleted) unconditionally before the
/// outcome is known; a failed flow must restart from initiation. Failures
/// land on the login page with an opaque error code, never a 500.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    let (jar, cookie_state) = state.cookies.consume_state(jar);

    let outcome = state
        .bridge
        .complete(
            query.code.as_deref(),
            query.state.as_deref(),
            cookie_state.as_deref(),
        )
        .await;

    match outcome {
        Ok(CallbackOutcome::Committed(tokens)) => {
            let jar = state.cookies.commit(jar, &tokens);
            (jar, Redirect::temporary("/")).into_response()
        }
        Ok(CallbackOutcome::Handoff {
            redirect_uri,
            tokens,
        }) => match with_token_param(&redirect_uri, &tokens.access_token) {
            Ok(target) => (jar, Redirect::temporary(&target)).into_response(),
            Err(e) => {
                error!(error = %e, "handoff target rejected at redirect time");
                (jar, Redirect::temporary("/login?error=oauth_failed")).into_response()
            }
        },
        Err(failure) => {
            warn!(code = failure.code(), "federation flow failed");
            let target = format!("/login?error={}", failure.code());
            (jar, Redirect::temporary(&target)).into_response()
        }
    }
}

/// Append the issued access token to a handoff target. The token
/// transiently appears in a URL here; this is the explicitly weaker legacy
/// mode, reachable only for allowlisted origins.
fn with_token_param(target: &str, access_token: &str) -> Result<String, AppError> {
    let mut url = Url::parse(target)
        .map_err(|e| AppError::InvalidParams(format!("Invalid handoff target: {}", e)))?;
    url.query_pairs_mut().append_pair("token", access_token);
    Ok(url.to_string())
}

/// POST /api/auth/google/complete-login — legacy client-driven completion.
///
/// The browser posts the externally verified identity and this endpoint
/// acquires backend tokens via the password grant, registering the user
/// first when — and only when — the backend confirms the email is absent.
pub async fn complete_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<Value>,
) -> Response {
    let email = body.get("email").and_then(|v| v.as_str()).unwrap_or("");
    let google_id = body.get("googleId").and_then(|v| v.as_str()).unwrap_or("");

    if email.is_empty() || google_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing required parameters" })),
        )
            .into_response();
    }

    let password = match kb_utils::crypto::generate_opaque_password() {
        Ok(password) => password,
        Err(e) => {
            error!(error = %e, "could not generate login password");
            return complete_login_error("Failed to complete login");
        }
    };

    // First attempt: the account may have been created by an earlier
    // completion with this flow's password. Normally this fails and the
    // registration path below takes over.
    match state.backend.password_grant(email, &password).await {
        Ok(tokens) => {
            let jar = state.cookies.commit(jar, &tokens);
            return (jar, Json(json!({ "success": true }))).into_response();
        }
        Err(e) => {
            info!(error = %e, "initial grant failed; resolving user");
        }
    }

    match state.backend.user_exists(email).await {
        Ok(true) => {
            // An existing account cannot be logged in with a password we
            // just invented; completing it here would require taking over
            // the account.
            warn!(email, "completion rejected for existing user");
            complete_login_error("Failed to complete login")
        }
        Ok(false) => {
            let user = NewUser {
                username: completion_username(email),
                email: email.to_string(),
                password: password.clone(),
                full_name: None,
                google_id: Some(google_id.to_string()),
                picture: None,
            };

            if let Err(e) = state.backend.register(&user).await {
                error!(error = %e, "registration failed during completion");
                return complete_login_error("Failed to register user");
            }

            match state.backend.password_grant(email, &password).await {
                Ok(tokens) => {
                    let jar = state.cookies.commit(jar, &tokens);
                    (jar, Json(json!({ "success": true }))).into_response()
                }
                Err(e) => {
                    error!(error = %e, "grant failed after registration");
                    complete_login_error("Failed to authenticate after registration")
                }
            }
        }
        Err(e) => {
            error!(error = %e, "user resolution failed during completion");
            complete_login_error("Failed to complete login")
        }
    }
}

fn complete_login_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
        .into_response()
}

/// Derive a registration username from the email's local part, sanitized
/// and suffixed so repeated completions do not collide.
fn completion_username(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let sanitized: String = local
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let suffix = chrono::Utc::now().timestamp_millis() % 1_000_000;
    format!("google_{}_{:06}", sanitized, suffix)
}
