//! Cryptographic utilities
//!
//! Secret generation for the federation flow: opaque one-shot passwords
//! and CSRF state entropy.

use anyhow::Result;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ring::rand::{SecureRandom, SystemRandom};

/// Generate an opaque password for backend registration during federated
/// login: base64url(32 random bytes), 43 chars.
///
/// The password exists only across the registration + immediate-login pair
/// of a single federation flow; callers must not persist it.
pub fn generate_opaque_password() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("Failed to generate random bytes"))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a random base64url nonce (16 bytes, 22 chars).
pub fn generate_nonce() -> Result<String> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("Failed to generate random bytes"))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_opaque_password() {
        let password = generate_opaque_password().unwrap();
        assert_eq!(password.len(), 43); // 32 bytes as unpadded base64url
    }

    #[test]
    fn test_passwords_are_unique() {
        let a = generate_opaque_password().unwrap();
        let b = generate_opaque_password().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_nonce_decodes() {
        let nonce = generate_nonce().unwrap();
        let decoded = URL_SAFE_NO_PAD.decode(&nonce).unwrap();
        assert_eq!(decoded.len(), 16);
    }
}
