//! Request forwarding to the token backend.
//!
//! Rewrites headers and bodies per the classification table, relays the
//! response with upstream cookies and hop-by-hop headers stripped, and
//! reports the custody action (commit/clear) the caller must apply to the
//! browser's cookie jar.

use kb_types::{AppError, AppResult, TokenSet};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use crate::classify::{classify, RoutePolicy};

/// Outbound request timeout. A hung backend maps to the same failure
/// class as a refused connection.
const FORWARD_TIMEOUT_SECS: u64 = 30;

/// Headers never copied from the inbound request. `cookie` is excluded
/// because cookie-derived credentials are re-injected explicitly by the
/// classification policy, never blanket-forwarded.
const SKIPPED_REQUEST_HEADERS: [&str; 5] =
    ["host", "connection", "cookie", "content-length", "authorization"];

/// Headers never relayed from the upstream response. The backend must not
/// set cookies through this mediator, and framing headers are recomputed
/// from the actual relayed body.
const SKIPPED_RESPONSE_HEADERS: [&str; 4] =
    ["set-cookie", "transfer-encoding", "connection", "content-length"];

/// What the caller must do to the browser's cookie jar after a forward.
#[derive(Debug, Clone)]
pub enum CustodyAction {
    /// No cookie changes.
    None,
    /// Token issuance succeeded upstream; commit these tokens.
    Commit(TokenSet),
    /// Revocation succeeded upstream; delete the token cookies.
    Clear,
}

/// An inbound request reduced to what forwarding needs. Built from a copy
/// of the original request; the original is never mutated.
#[derive(Debug)]
pub struct ForwardRequest {
    /// Path tail under the proxy mount, e.g. `oauth2/token`
    pub slug: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Access token read from the HttpOnly cookie, if any
    pub access_cookie: Option<String>,
}

/// The relayed response plus the custody action to apply.
#[derive(Debug)]
pub struct ForwardOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub custody: CustodyAction,
}

/// Reverse proxy to the backend token API.
pub struct Forwarder {
    client: Client,
    base_url: String,
    basic_auth: Option<String>,
}

impl Forwarder {
    /// `basic_auth` is the precomputed `Basic ...` header value for
    /// client-authenticated paths; `None` means unconfigured (non-fatal).
    pub fn new(base_url: String, basic_auth: Option<String>) -> AppResult<Self> {
        // Redirects are relayed to the browser, never followed here; the
        // backend's OAuth redirect semantics must survive the hop.
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(FORWARD_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_auth,
        })
    }

    /// Forward one request and classify the custody consequences.
    pub async fn forward(&self, request: ForwardRequest) -> AppResult<ForwardOutcome> {
        let target = format!("{}/{}", self.base_url, request.slug);
        let policy = classify(&request.slug);
        let headers = self.outbound_headers(&request, policy);

        debug!(slug = %request.slug, ?policy, "forwarding request to backend");

        let mut outbound = self
            .client
            .request(request.method.clone(), &target)
            .headers(headers);

        outbound = match prepare_body(&request) {
            PreparedBody::Form(encoded) => outbound
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded),
            PreparedBody::Raw(bytes) => outbound.body(bytes),
            PreparedBody::Empty => outbound,
        };

        let response = outbound
            .send()
            .await
            .map_err(|e| AppError::Proxy(format!("Failed to reach backend: {}", e)))?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in SKIPPED_RESPONSE_HEADERS {
            headers.remove(name);
        }

        if request.slug == "oauth2/token" && status.is_success() {
            let body = read_body(response).await?;
            let tokens: TokenSet = serde_json::from_slice(&body)
                .map_err(|e| AppError::Proxy(format!("Unreadable token response: {}", e)))?;
            return Ok(ForwardOutcome {
                status,
                headers,
                body,
                custody: CustodyAction::Commit(tokens),
            });
        }

        if request.slug == "oauth2/revoke" && status.is_success() {
            return Ok(ForwardOutcome {
                status,
                headers,
                body: Vec::new(),
                custody: CustodyAction::Clear,
            });
        }

        let body = read_body(response).await?;
        Ok(ForwardOutcome {
            status,
            headers,
            body,
            custody: CustodyAction::None,
        })
    }

    /// Copy inbound headers minus hop-by-hop/session headers, then apply
    /// the injection policy. Operates on a fresh map; the inbound request
    /// is left untouched.
    fn outbound_headers(&self, request: &ForwardRequest, policy: RoutePolicy) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            if SKIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }

        match policy {
            RoutePolicy::NoAuth => {
                debug!(slug = %request.slug, "stripped Authorization header");
            }
            RoutePolicy::ClientBasic => match &self.basic_auth {
                Some(basic) => {
                    if let Ok(value) = HeaderValue::from_str(basic) {
                        headers.insert(AUTHORIZATION, value);
                    }
                }
                None => {
                    warn!(
                        slug = %request.slug,
                        "client credentials not configured; forwarding without Authorization"
                    );
                }
            },
            RoutePolicy::BearerPreferHeader => {
                if let Some(caller) = request.headers.get(AUTHORIZATION) {
                    headers.insert(AUTHORIZATION, caller.clone());
                } else if let Some(token) = &request.access_cookie {
                    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                        headers.insert(AUTHORIZATION, value);
                    }
                }
            }
        }

        headers
    }
}

enum PreparedBody {
    Form(String),
    Raw(Vec<u8>),
    Empty,
}

/// Token and revoke forms are parsed and re-serialized so malformed
/// pass-through encodings never reach the backend; everything else is
/// relayed byte-for-byte.
fn prepare_body(request: &ForwardRequest) -> PreparedBody {
    let is_form = request
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form && matches!(request.slug.as_str(), "oauth2/token" | "oauth2/revoke") {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(&request.body)
            .into_owned()
            .collect();
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        return PreparedBody::Form(encoded);
    }

    if request.body.is_empty() {
        PreparedBody::Empty
    } else {
        PreparedBody::Raw(request.body.clone())
    }
}

async fn read_body(response: reqwest::Response) -> AppResult<Vec<u8>> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| AppError::Proxy(format!("Failed to read backend response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forwarder(basic_auth: Option<&str>) -> Forwarder {
        Forwarder::new(
            "http://localhost:8000".to_string(),
            basic_auth.map(|s| s.to_string()),
        )
        .unwrap()
    }

    fn request(slug: &str, headers: HeaderMap, access_cookie: Option<&str>) -> ForwardRequest {
        ForwardRequest {
            slug: slug.to_string(),
            method: Method::POST,
            headers,
            body: Vec::new(),
            access_cookie: access_cookie.map(|s| s.to_string()),
        }
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_personal_bearer_never_reaches_client_routes() {
        let fwd = forwarder(Some("Basic abc123"));

        for slug in ["oauth2/token", "oauth2/revoke", "v1/users/register"] {
            let req = request(slug, bearer_headers("user-token"), Some("cookie-token"));
            let headers = fwd.outbound_headers(&req, classify(slug));
            assert_eq!(
                headers.get(AUTHORIZATION).unwrap(),
                "Basic abc123",
                "slug {} must carry client Basic auth",
                slug
            );
        }
    }

    #[test]
    fn test_client_routes_without_credentials_send_nothing() {
        let fwd = forwarder(None);

        let req = request("oauth2/token", bearer_headers("user-token"), None);
        let headers = fwd.outbound_headers(&req, classify("oauth2/token"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_userinfo_forwards_caller_header_verbatim() {
        let fwd = forwarder(Some("Basic abc123"));

        let req = request(
            "oauth2/userinfo",
            bearer_headers("caller-token"),
            Some("cookie-token"),
        );
        let headers = fwd.outbound_headers(&req, classify("oauth2/userinfo"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer caller-token");
    }

    #[test]
    fn test_userinfo_falls_back_to_cookie() {
        let fwd = forwarder(None);

        let req = request("oauth2/userinfo", HeaderMap::new(), Some("cookie-token"));
        let headers = fwd.outbound_headers(&req, classify("oauth2/userinfo"));
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer cookie-token");
    }

    #[test]
    fn test_userinfo_without_any_credential() {
        let fwd = forwarder(None);

        let req = request("oauth2/userinfo", HeaderMap::new(), None);
        let headers = fwd.outbound_headers(&req, classify("oauth2/userinfo"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_unclassified_routes_strip_authorization() {
        let fwd = forwarder(Some("Basic abc123"));

        let req = request("v1/users/me", bearer_headers("user-token"), Some("tok"));
        let headers = fwd.outbound_headers(&req, classify("v1/users/me"));
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_session_headers_not_forwarded() {
        let fwd = forwarder(None);

        let mut inbound = HeaderMap::new();
        inbound.insert("host", HeaderValue::from_static("localhost:3000"));
        inbound.insert("cookie", HeaderValue::from_static("accessToken=secret"));
        inbound.insert("connection", HeaderValue::from_static("keep-alive"));
        inbound.insert("content-length", HeaderValue::from_static("42"));
        inbound.insert("x-request-id", HeaderValue::from_static("req-1"));

        let req = request("v1/anything", inbound, None);
        let headers = fwd.outbound_headers(&req, classify("v1/anything"));

        assert!(headers.get("host").is_none());
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("connection").is_none());
        assert!(headers.get("content-length").is_none());
        assert_eq!(headers.get("x-request-id").unwrap(), "req-1");
    }

    #[test]
    fn test_form_body_reencoded_for_token_route() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let req = ForwardRequest {
            slug: "oauth2/token".to_string(),
            method: Method::POST,
            headers,
            body: b"grant_type=password&username=u%40example.com&password=p".to_vec(),
            access_cookie: None,
        };

        match prepare_body(&req) {
            PreparedBody::Form(encoded) => {
                assert!(encoded.contains("grant_type=password"));
                assert!(encoded.contains("username=u%40example.com"));
            }
            _ => panic!("token form should be re-encoded"),
        }
    }

    #[test]
    fn test_raw_body_passthrough_for_other_routes() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let req = ForwardRequest {
            slug: "v1/users/register".to_string(),
            method: Method::POST,
            headers,
            body: br#"{"email":"a@b.c"}"#.to_vec(),
            access_cookie: None,
        };

        match prepare_body(&req) {
            PreparedBody::Raw(bytes) => assert_eq!(bytes, br#"{"email":"a@b.c"}"#),
            _ => panic!("json body should pass through unchanged"),
        }
    }

    #[test]
    fn test_empty_body_omitted() {
        let req = request("v1/users/check", HeaderMap::new(), None);
        assert!(matches!(prepare_body(&req), PreparedBody::Empty));
    }
}
