//! Cryptographic utilities for token hashing and webhook signatures.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes an HMAC-SHA256 signature over the payload and returns it as hex.
///
/// Used to verify payment-confirmation webhooks: the sender signs the raw
/// request body with the shared webhook secret.
pub fn hmac_sha256_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies an HMAC-SHA256 hex signature in constant time.
pub fn verify_hmac_sha256_hex(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_empty_string() {
        let hash = sha256_hex("");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("same_input"), sha256_hex("same_input"));
        assert_ne!(sha256_hex("input1"), sha256_hex("input2"));
    }

    #[test]
    fn test_hmac_signature_round_trip() {
        let secret = "whsec_test_secret";
        let payload = br#"{"payment_intent_id":"pi_123"}"#;
        let sig = hmac_sha256_hex(secret, payload);
        assert_eq!(sig.len(), 64);
        assert!(verify_hmac_sha256_hex(secret, payload, &sig));
    }

    #[test]
    fn test_hmac_rejects_wrong_secret() {
        let payload = b"payload";
        let sig = hmac_sha256_hex("secret_a", payload);
        assert!(!verify_hmac_sha256_hex("secret_b", payload, &sig));
    }

    #[test]
    fn test_hmac_rejects_tampered_payload() {
        let secret = "whsec_test_secret";
        let sig = hmac_sha256_hex(secret, b"original");
        assert!(!verify_hmac_sha256_hex(secret, b"tampered", &sig));
    }

    #[test]
    fn test_hmac_rejects_malformed_signature() {
        assert!(!verify_hmac_sha256_hex("secret", b"payload", "not-hex"));
        assert!(!verify_hmac_sha256_hex("secret", b"payload", ""));
    }
}
