//! Database models for accounts.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::AccountId;

/// Database entity model
///
/// Token columns hold SHA-256 digests (see [`crate::auth::tokens::token_digest`]).
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for creating an account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    /// Already normalized
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub verification_token_digest: String,
    pub verification_expires: DateTime<Utc>,
}
