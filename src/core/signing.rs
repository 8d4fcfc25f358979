//! HMAC-SHA256 signatures binding tokens to their metadata.
//!
//! A token's wire form is its identifier plus this signature; the engine
//! verifies the signature against the stored metadata before touching any
//! state, so a guessed or tampered identifier fails closed.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `data` under `secret`, hex-encoded.
#[must_use]
#[allow(clippy::expect_used)] // HMAC-SHA256 accepts keys of any size
pub fn sign(secret: &str, data: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a hex-encoded HMAC-SHA256 signature.
///
/// Malformed hex verifies as false rather than erroring; callers only need
/// the boolean.
#[must_use]
#[allow(clippy::expect_used)] // HMAC-SHA256 accepts keys of any size
pub fn verify(secret: &str, data: &str, signature: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let sig = sign("secret", "token-1|listing-9|10");
        assert!(verify("secret", "token-1|listing-9|10", &sig));
    }

    #[test]
    fn test_verify_rejects_tampered_data() {
        let sig = sign("secret", "token-1|listing-9|10");
        assert!(!verify("secret", "token-1|listing-9|99", &sig));
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let sig = sign("secret", "payload");
        assert!(!verify("other-secret", "payload", &sig));
    }

    #[test]
    fn test_verify_rejects_malformed_hex() {
        assert!(!verify("secret", "payload", "not-hex!"));
    }
}
