//! HMAC helpers for webhook signatures.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the HMAC-SHA256 of `body` keyed with `secret`, hex encoded.
pub fn hmac_sha256_hex(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex encoded HMAC-SHA256 signature in constant time.
///
/// Returns false for signatures that are not valid hex.
pub fn verify_hmac_sha256_hex(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_vector() {
        // RFC 4231 test case 2
        let sig = hmac_sha256_hex("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_roundtrip() {
        let body = br#"{"type":"message.new"}"#;
        let sig = hmac_sha256_hex("secret", body);
        assert!(verify_hmac_sha256_hex("secret", body, &sig));
        assert!(!verify_hmac_sha256_hex("other", body, &sig));
        assert!(!verify_hmac_sha256_hex("secret", b"tampered", &sig));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(!verify_hmac_sha256_hex("secret", b"body", "not-hex"));
        assert!(!verify_hmac_sha256_hex("secret", b"body", ""));
    }

    #[test]
    fn test_verify_tolerates_whitespace() {
        let sig = hmac_sha256_hex("secret", b"body");
        assert!(verify_hmac_sha256_hex("secret", b"body", &format!(" {}\n", sig)));
    }
}
