use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs()
}

/// Issues and verifies bearer tokens for the single-operator login flow.
///
/// Tokens are stateless: `"{expiry}.{hex hmac}"`. A restart invalidates
/// every outstanding token since the signing secret is regenerated, which
/// just means the operator logs in again — acceptable for a homelab tool
/// with one user.
pub struct TokenAuthority {
    secret: Vec<u8>,
    ttl_secs: u64,
}

impl TokenAuthority {
    pub fn new(ttl_days: u32) -> Self {
        Self {
            secret: Uuid::new_v4().as_bytes().to_vec(),
            ttl_secs: u64::from(ttl_days) * 86_400,
        }
    }

    pub fn issue(&self) -> String {
        let expires_at = now_secs() + self.ttl_secs;
        let sig = self.sign(expires_at);
        format!("{expires_at}.{sig}")
    }

    pub fn verify(&self, token: &str) -> bool {
        let Some((expiry_str, sig)) = token.split_once('.') else {
            return false;
        };
        let Ok(expires_at) = expiry_str.parse::<u64>() else {
            return false;
        };
        if now_secs() >= expires_at {
            return false;
        }
        let Ok(given) = hex::decode(sig) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(expiry_str.as_bytes());
        mac.verify_slice(&given).is_ok()
    }

    fn sign(&self, expires_at: u64) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(expires_at.to_string().as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Plaintext comparison against the configured operator password. Matches
/// the corpus's own "plaintext for now" password mode — no hashing layer
/// has been built for this yet.
pub fn verify_password(given: &str, configured: &Option<String>) -> bool {
    match configured {
        Some(expected) => given == expected,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let authority = TokenAuthority::new(7);
        let token = authority.issue();
        assert!(authority.verify(&token));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let authority = TokenAuthority::new(7);
        let token = authority.issue();
        let (expiry, _) = token.split_once('.').unwrap();
        let tampered = format!("{expiry}.{}", "0".repeat(64));
        assert!(!authority.verify(&tampered));
    }

    #[test]
    fn token_from_different_authority_is_rejected() {
        let a = TokenAuthority::new(7);
        let b = TokenAuthority::new(7);
        let token = a.issue();
        assert!(!b.verify(&token));
    }

    #[test]
    fn expired_token_is_rejected() {
        let authority = TokenAuthority::new(0);
        let token = authority.issue();
        assert!(!authority.verify(&token));
    }

    #[test]
    fn password_check_rejects_when_unconfigured() {
        assert!(!verify_password("anything", &None));
    }
}
