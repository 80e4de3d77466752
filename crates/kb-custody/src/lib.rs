//! Token custody: where credentials are allowed to live.
//!
//! Translates token responses into HttpOnly, scoped, expiring cookies and
//! back. The browser never sees a bearer credential in script-readable
//! storage; everything this module issues is HttpOnly, path `/`,
//! SameSite=Lax, and `Secure` in production-like deployments.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use kb_types::TokenSet;
use tracing::debug;

/// Access-token cookie name
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Refresh-token cookie name
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// CSRF-state cookie for the federation flow; write-once at initiation,
/// read-once-and-delete at callback
pub const AUTH_STATE_COOKIE: &str = "googleAuthState";

/// Fallback access-token lifetime when the backend sends no expiry hint
const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;

/// Refresh tokens are long-lived by policy, not by backend hint
const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Federation state cookies are short-lived by design
const AUTH_STATE_TTL_SECS: i64 = 600;

/// Cookie issuance policy.
///
/// `commit` and `clear` are idempotent: repeating either produces the same
/// end state in the browser's jar.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    secure: bool,
}

impl CookiePolicy {
    /// `secure` should be true in production-like environments so cookies
    /// are only sent over TLS.
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Issue cookies for a freshly acquired token set.
    pub fn commit(&self, jar: CookieJar, tokens: &TokenSet) -> CookieJar {
        let max_age = tokens.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS);
        let mut jar = jar.add(self.build(
            ACCESS_TOKEN_COOKIE,
            tokens.access_token.clone(),
            max_age,
        ));

        if let Some(refresh_token) = &tokens.refresh_token {
            jar = jar.add(self.build(REFRESH_TOKEN_COOKIE, refresh_token.clone(), REFRESH_TTL_SECS));
        }

        debug!(max_age, "committed token cookies");
        jar
    }

    /// Delete both token cookies. Used on logout and successful revocation.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.add(self.expired(ACCESS_TOKEN_COOKIE))
            .add(self.expired(REFRESH_TOKEN_COOKIE))
    }

    /// Store the federation CSRF state for the duration of one flow.
    pub fn stash_state(&self, jar: CookieJar, value: String) -> CookieJar {
        jar.add(self.build(AUTH_STATE_COOKIE, value, AUTH_STATE_TTL_SECS))
    }

    /// Read the federation CSRF state and delete the cookie in the same
    /// response, regardless of whether validation later succeeds. This is
    /// the single-use guarantee.
    pub fn consume_state(&self, jar: CookieJar) -> (CookieJar, Option<String>) {
        let value = jar.get(AUTH_STATE_COOKIE).map(|c| c.value().to_string());
        let jar = jar.add(self.expired(AUTH_STATE_COOKIE));
        (jar, value)
    }

    fn build(&self, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
        Cookie::build((name, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(max_age_secs))
            .build()
    }

    fn expired(&self, name: &'static str) -> Cookie<'static> {
        Cookie::build((name, ""))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(0))
            .build()
    }
}
