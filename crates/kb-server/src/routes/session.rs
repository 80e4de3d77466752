//! Session routes: token read-out, logout, and the user-info read-through.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use kb_custody::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use serde_json::json;
use tracing::{error, warn};

use crate::state::AppState;

/// GET /api/auth/getToken — hand the cookie-held access token to the
/// first-party client. 401 when no session exists.
pub async fn get_token(jar: CookieJar) -> Response {
    match jar.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) => Json(json!({ "token": cookie.value() })).into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "No access token found" })),
        )
            .into_response(),
    }
}

/// POST /api/auth/logout — delete the token cookies. Cookie deletion is
/// the whole contract; revocation has its own proxied endpoint.
pub async fn auth_logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = state.cookies.clear(jar);
    (jar, Json(json!({ "message": "Logged out successfully" }))).into_response()
}

/// GET /api/me — user-info read-through.
///
/// Reconstructs the bearer credential from the HttpOnly cookie and relays
/// the backend's userinfo response, status and body alike, so the client
/// sees the backend's own error shape on expiry.
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = match jar.get(ACCESS_TOKEN_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not authenticated" })),
            )
                .into_response();
        }
    };

    match state.backend.userinfo(&token).await {
        Ok((status, body)) => (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "user info read-through failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch user info" })),
            )
                .into_response()
        }
    }
}

/// POST /api/logout — end the session.
///
/// Best-effort revocation of whatever tokens the cookies hold, then
/// unconditional cookie deletion. A failed revocation never blocks logout.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(refresh) = jar.get(REFRESH_TOKEN_COOKIE) {
        if let Err(e) = state.backend.revoke(refresh.value(), "refresh_token").await {
            warn!(error = %e, "refresh token revocation failed");
        }
    }

    if let Some(access) = jar.get(ACCESS_TOKEN_COOKIE) {
        if let Err(e) = state.backend.revoke(access.value(), "access_token").await {
            warn!(error = %e, "access token revocation failed");
        }
    }

    let jar = state.cookies.clear(jar);
    (jar, Json(json!({ "success": true }))).into_response()
}
