//! HTTP surface for Keybridge.
//!
//! Assembles the axum application: dedicated session and federation routes
//! first, then the catch-all credential-injecting proxy under
//! `/api/auth/{*slug}`.

pub mod routes;
pub mod state;

pub use state::AppState;

use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::{any, get, post};
use axum::{Json, Router};
use kb_config::AppConfig;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Start the web server.
///
/// Binds the configured host/port (port 0 picks an ephemeral port, used by
/// the integration tests) and serves until the task is aborted. Returns
/// the state, the server task handle, and the actual bound port.
pub async fn start_server(
    config: AppConfig,
) -> anyhow::Result<(AppState, tokio::task::JoinHandle<()>, u16)> {
    let host = config.server.host.clone();
    let requested_port = config.server.port;

    let state = AppState::from_config(config)?;
    let app = build_app(state.clone());

    let host_ip = host.parse::<std::net::IpAddr>()?;
    let listener = TcpListener::bind(SocketAddr::from((host_ip, requested_port))).await?;
    let port = listener.local_addr()?.port();

    info!("Keybridge listening on http://{}:{}", host, port);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok((state, handle, port))
}

/// Build the axum app with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let enable_cors = state.config.server.enable_cors;

    let mut router = Router::new()
        .route("/health", get(health_check))
        // Session surface
        .route("/api/auth/getToken", get(routes::session::get_token))
        .route("/api/auth/logout", post(routes::session::auth_logout))
        .route("/api/me", get(routes::session::me))
        .route("/api/logout", post(routes::session::logout))
        // Federation surface
        .route("/api/auth/google/login", get(routes::google::login))
        .route("/api/auth/google/callback", get(routes::google::callback))
        .route(
            "/api/auth/google/complete-login",
            post(routes::google::complete_login),
        )
        // Everything else under /api/auth is proxied to the backend
        .route("/api/auth/{*slug}", any(routes::proxy::proxy))
        .with_state(state);

    router = router.layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
            .allow_credentials(false);

        router = router.layer(cors);
    }

    router
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
