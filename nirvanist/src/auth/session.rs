//! JWT session token creation and verification.
//!
//! Session tokens are stateless: validity is a function of the signature, the server secret and
//! the wall clock. Nothing is persisted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::Config, errors::Error, types::AccountId};

/// JWT session claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: AccountId, // Subject (account ID)
    pub exp: i64,       // Expiration time
    pub iat: i64,       // Issued at
}

/// Issues and verifies session tokens with the server secret.
///
/// Built once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: Duration,
}

impl SessionIssuer {
    pub fn new(secret_key: &str, expiry: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            expiry,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let secret_key = config.secret_key.as_deref().ok_or_else(|| Error::Internal {
            operation: "JWT sessions: secret_key is required".to_string(),
        })?;
        Ok(Self::new(secret_key, config.auth.security.jwt_expiry))
    }

    /// Create a session token for an account, valid from now.
    pub fn issue(&self, account_id: AccountId) -> Result<String, Error> {
        self.issue_at(account_id, Utc::now())
    }

    pub fn issue_at(&self, account_id: AccountId, issued_at: DateTime<Utc>) -> Result<String, Error> {
        let expires_at = issued_at + self.expiry;
        let claims = SessionClaims {
            sub: account_id,
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| Error::Internal {
            operation: format!("create JWT: {e}"),
        })
    }

    /// Verify a session token.
    ///
    /// Fails closed: malformed input, a bad signature or an expired token all yield `None`.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a session token as of `now`. A token is valid strictly before its `exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        // jsonwebtoken accepts `now == exp`, so expiry is checked here instead
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let claims = match decode::<SessionClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return None;
            }
        };

        if now.timestamp() >= claims.exp {
            debug!(exp = claims.exp, "Rejected expired session token");
            return None;
        }
        Some(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[test]
    fn test_issue_and_verify() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);
        let account_id = Uuid::new_v4();

        let token = issuer.issue(account_id).unwrap();
        let claims = issuer.verify(&token).expect("token should verify");

        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.exp - claims.iat, WEEK.as_secs() as i64);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);
        let issued_at = Utc::now() - chrono::Duration::days(8);

        let token = issuer.issue_at(Uuid::new_v4(), issued_at).unwrap();
        assert!(issuer.verify(&token).is_none());
    }

    #[test]
    fn test_token_invalid_at_exact_expiry() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);
        let issued_at = Utc::now();
        let expires_at = issued_at + WEEK;

        let token = issuer.issue_at(Uuid::new_v4(), issued_at).unwrap();

        let one_second = chrono::Duration::seconds(1);
        assert!(issuer.verify_at(&token, expires_at - one_second).is_some());
        assert!(issuer.verify_at(&token, expires_at).is_none());
        assert!(issuer.verify_at(&token, expires_at + one_second).is_none());
    }

    #[test]
    fn test_token_near_end_of_lifetime_still_valid() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);
        let issued_at = Utc::now() - chrono::Duration::days(6);

        let token = issuer.issue_at(Uuid::new_v4(), issued_at).unwrap();
        assert!(issuer.verify(&token).is_some());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = SessionIssuer::new("secret-one", WEEK);
        let other = SessionIssuer::new("secret-two", WEEK);

        let token = issuer.issue(Uuid::new_v4()).unwrap();
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);

        assert!(issuer.verify("").is_none());
        assert!(issuer.verify("not.a.jwt").is_none());
        assert!(issuer.verify("definitely-not-a-token").is_none());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = SessionIssuer::new("test-secret-key-for-jwt", WEEK);
        let token = issuer.issue(Uuid::new_v4()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let other_token = issuer.issue(Uuid::new_v4()).unwrap();
        let other_payload = other_token.split('.').nth(1).unwrap();
        parts[1] = other_payload;
        let spliced = parts.join(".");

        // Signature from the first token over the second payload
        if spliced != other_token {
            assert!(issuer.verify(&spliced).is_none());
        }
    }

    #[test]
    fn test_from_config_requires_secret() {
        let config = Config::default();
        assert!(SessionIssuer::from_config(&config).is_err());

        let config = Config {
            secret_key: Some("configured".to_string()),
            ..Default::default()
        };
        assert!(SessionIssuer::from_config(&config).is_ok());
    }
}
