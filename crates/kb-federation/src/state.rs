//! CSRF state for the federation flow.
//!
//! Minted at initiation, carried both in a short-lived HttpOnly cookie and
//! in the provider's `state` query parameter, and consumed exactly once at
//! callback. The two copies must match exactly.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use kb_types::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bridge::FederationError;

/// Single-use, time-boxed flow state. `redirect_uri` carries an optional
/// caller-supplied post-login handoff target (legacy mode).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CsrfState {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,

    #[serde(rename = "redirectUri", default)]
    pub redirect_uri: Option<String>,
}

impl CsrfState {
    pub fn mint(redirect_uri: Option<String>) -> Self {
        Self {
            csrf_token: Uuid::new_v4().to_string(),
            redirect_uri,
        }
    }

    /// Serialize for the cookie and the `state` query parameter. Both carry
    /// the same value: base64url over the JSON body, so the state survives
    /// cookie-octet and query-string restrictions unchanged.
    pub fn encode(&self) -> AppResult<String> {
        let json = serde_json::to_string(self).map_err(AppError::from)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(raw: &str) -> Result<Self, FederationError> {
        let json = URL_SAFE_NO_PAD
            .decode(raw.as_bytes())
            .map_err(|_| FederationError::InvalidStateFormat)?;
        serde_json::from_slice(&json).map_err(|_| FederationError::InvalidStateFormat)
    }
}

/// Validate the callback's state pair: both the cookie-stored and the
/// query-returned state must be present, parse, and agree on the CSRF
/// token. Returns the stored state (it owns the handoff target).
pub fn validate_state(
    cookie_state: Option<&str>,
    received_state: Option<&str>,
) -> Result<CsrfState, FederationError> {
    let (cookie_state, received_state) = match (cookie_state, received_state) {
        (Some(c), Some(r)) => (c, r),
        _ => return Err(FederationError::InvalidState),
    };

    let stored = CsrfState::decode(cookie_state)?;
    let received = CsrfState::decode(received_state)?;

    if stored.csrf_token != received.csrf_token {
        return Err(FederationError::InvalidState);
    }

    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_produces_unique_tokens() {
        let a = CsrfState::mint(None);
        let b = CsrfState::mint(None);
        assert_ne!(a.csrf_token, b.csrf_token);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let state = CsrfState::mint(Some("https://app.example.com/cb".to_string()));
        let encoded = state.encode().unwrap();
        let validated = validate_state(Some(&encoded), Some(&encoded)).unwrap();
        assert_eq!(validated, state);
    }

    #[test]
    fn test_missing_cookie_state_fails() {
        let state = CsrfState::mint(None).encode().unwrap();
        assert!(matches!(
            validate_state(None, Some(&state)),
            Err(FederationError::InvalidState)
        ));
    }

    #[test]
    fn test_missing_query_state_fails() {
        let state = CsrfState::mint(None).encode().unwrap();
        assert!(matches!(
            validate_state(Some(&state), None),
            Err(FederationError::InvalidState)
        ));
    }

    #[test]
    fn test_single_character_mismatch_fails() {
        let stored = CsrfState::mint(None);
        let mut tampered = stored.clone();
        // Flip one character of the token.
        let mut chars: Vec<char> = tampered.csrf_token.chars().collect();
        chars[0] = if chars[0] == 'a' { 'b' } else { 'a' };
        tampered.csrf_token = chars.into_iter().collect();

        let result = validate_state(
            Some(&stored.encode().unwrap()),
            Some(&tampered.encode().unwrap()),
        );
        assert!(matches!(result, Err(FederationError::InvalidState)));
    }

    #[test]
    fn test_unparsable_state_is_format_error() {
        let good = CsrfState::mint(None).encode().unwrap();
        assert!(matches!(
            validate_state(Some("not-json"), Some(&good)),
            Err(FederationError::InvalidStateFormat)
        ));
        assert!(matches!(
            validate_state(Some(&good), Some("{broken")),
            Err(FederationError::InvalidStateFormat)
        ));
    }

    #[test]
    fn test_redirect_uri_survives_round_trip() {
        let state = CsrfState::mint(Some("https://app.example.com/done".to_string()));
        let encoded = state.encode().unwrap();
        let validated = validate_state(Some(&encoded), Some(&encoded)).unwrap();
        assert_eq!(
            validated.redirect_uri.as_deref(),
            Some("https://app.example.com/done")
        );
    }
}
