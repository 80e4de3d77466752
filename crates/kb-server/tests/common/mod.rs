//! Shared helpers for server integration tests: spawn the app against
//! stub backends and inspect cookies without a cookie store.

use kb_config::{AppConfig, BackendConfig, GoogleConfig, HandoffConfig, ServerConfig};

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start the app on an ephemeral port, pointed at stub backend and
/// provider servers. The returned client follows no redirects so OAuth
/// redirect semantics stay observable.
pub async fn spawn_app(backend_uri: &str, provider_uri: &str, handoff: HandoffConfig) -> TestApp {
    let config = AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            enable_cors: false,
        },
        backend: BackendConfig::new(
            backend_uri.to_string(),
            Some("client".to_string()),
            Some("secret".to_string()),
        ),
        google: GoogleConfig {
            client_id: "gid".to_string(),
            client_secret: "gsecret".to_string(),
            redirect_uri: "http://localhost:3000/api/auth/google/callback".to_string(),
            auth_url: format!("{}/auth", provider_uri),
            token_url: format!("{}/token", provider_uri),
            userinfo_url: format!("{}/userinfo", provider_uri),
        },
        public_url: "http://localhost:3000".to_string(),
        production: false,
        handoff,
    };

    let (_state, _handle, port) = kb_server::start_server(config)
        .await
        .expect("server should start");

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client should build");

    TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client,
    }
}

/// All `set-cookie` header values on a response.
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().expect("cookie header should be ascii").to_string())
        .collect()
}

/// The value of a named cookie among `set-cookie` headers, if present.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix)).map(|c| {
        c[prefix.len()..]
            .split(';')
            .next()
            .unwrap_or("")
            .to_string()
    })
}

/// The full `set-cookie` directive for a named cookie, if present.
pub fn cookie_directive<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix))
}
