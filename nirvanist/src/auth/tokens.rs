//! Opaque capability tokens for email verification, password reset and newsletter confirmation.
//!
//! Tokens carry no claims. They are looked up against storage, and account tokens are stored
//! only as a SHA-256 digest so a database read doesn't yield usable links.

use rand::prelude::RngExt;
use rand::rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a 32-byte (256 bit) random token, hex encoded.
pub fn issue_opaque_token() -> String {
    let mut token_bytes = [0u8; 32];
    rng().fill(&mut token_bytes);
    hex::encode(token_bytes)
}

/// Generate a newsletter confirmation token.
pub fn issue_confirmation_token() -> Uuid {
    Uuid::new_v4()
}

/// Digest under which an account token is stored and looked up.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_opaque_token_format() {
        let token = issue_opaque_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_opaque_token_uniqueness() {
        let mut tokens = HashSet::new();
        for _ in 0..1000 {
            assert!(tokens.insert(issue_opaque_token()), "Generated duplicate token");
        }
    }

    #[test]
    fn test_digest_is_stable_and_distinct() {
        let token = issue_opaque_token();

        assert_eq!(token_digest(&token), token_digest(&token));
        assert_ne!(token_digest(&token), token);
        assert_ne!(token_digest(&token), token_digest(&issue_opaque_token()));
        assert_eq!(token_digest(&token).len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_confirmation_tokens_differ() {
        assert_ne!(issue_confirmation_token(), issue_confirmation_token());
    }
}
