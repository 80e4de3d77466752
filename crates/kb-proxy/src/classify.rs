//! Route classification: which credential, if any, an outbound request to
//! the backend is allowed to carry.
//!
//! A single declarative table, total over all proxied paths. The forwarder
//! consults it and never branches on path strings itself.

/// Injection policy for a proxied backend path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// Strip any caller Authorization header; forward no credential.
    /// The default for unclassified paths.
    NoAuth,

    /// Authenticate as the client application: synthesize Basic auth from
    /// configured client credentials. The caller's personal bearer token is
    /// never forwarded on these paths.
    ClientBasic,

    /// Forward the caller's Authorization header verbatim when present,
    /// else synthesize `Bearer` from the access-token cookie, else nothing.
    BearerPreferHeader,
}

/// Classify a backend path slug. Pure and deterministic: same slug, same
/// policy, on every call.
pub fn classify(slug: &str) -> RoutePolicy {
    match slug {
        "oauth2/userinfo" => RoutePolicy::BearerPreferHeader,
        "oauth2/token" | "oauth2/revoke" => RoutePolicy::ClientBasic,
        s if s == "v1/users/register" || s.starts_with("v1/users/register/") => {
            RoutePolicy::ClientBasic
        }
        _ => RoutePolicy::NoAuth,
    }
}
