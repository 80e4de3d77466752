//! The catch-all proxy route: `ANY /api/auth/{*slug}`.
//!
//! Everything not handled by a dedicated route is forwarded to the backend
//! token API through the credential-injection policy, with custody actions
//! (cookie commit/clear) applied to the response on the way out.

use axum::body::to_bytes;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use kb_custody::ACCESS_TOKEN_COOKIE;
use kb_proxy::{CustodyAction, ForwardRequest};
use kb_types::AppError;
use serde_json::json;
use tracing::{error, warn};

use crate::state::AppState;

/// Largest request body the proxy will buffer and relay
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub async fn proxy(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    jar: CookieJar,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(e) => {
            warn!(slug, error = %e, "could not read request body");
            return proxy_error(format!("Could not read request body: {}", e));
        }
    };

    let access_cookie = jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string());

    let outcome = state
        .forwarder
        .forward(ForwardRequest {
            slug: slug.clone(),
            method: parts.method,
            headers: parts.headers,
            body,
            access_cookie,
        })
        .await;

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(AppError::Proxy(detail)) => {
            error!(slug, detail, "proxy forward failed");
            return proxy_error(detail);
        }
        Err(e) => {
            error!(slug, error = %e, "unexpected forward failure");
            return proxy_error(e.to_string());
        }
    };

    let jar = match outcome.custody {
        CustodyAction::Commit(ref tokens) => state.cookies.commit(jar, tokens),
        CustodyAction::Clear => state.cookies.clear(jar),
        CustodyAction::None => jar,
    };

    (outcome.status, jar, outcome.headers, outcome.body).into_response()
}

fn proxy_error(detail: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({
            "error": "Proxy error",
            "detail": detail,
        })),
    )
        .into_response()
}
