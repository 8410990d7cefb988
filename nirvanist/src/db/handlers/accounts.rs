//! Account storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::{
    db::{
        errors::{DbError, Result},
        models::accounts::{Account, AccountCreateDBRequest},
    },
    types::{AccountId, abbrev_uuid},
};

/// Credential store for registered accounts.
///
/// Token arguments are digests, never raw tokens. The `consume_*` operations are atomic:
/// a token matches at most one caller, after which it is cleared.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account.
    ///
    /// # Errors
    /// - `UniqueViolation` on table `accounts` if the email is already registered
    async fn create(&self, request: &AccountCreateDBRequest) -> Result<Account>;

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    /// Look up by normalized email.
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Replace the pending verification token.
    ///
    /// # Errors
    /// - `NotFound` if the account doesn't exist
    async fn set_verification_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Mark the matching account verified and clear its token.
    ///
    /// Returns `None` if no account holds the digest or the token has expired.
    async fn consume_verification_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>>;

    /// Replace the reset token and its expiry (last write wins).
    ///
    /// # Errors
    /// - `NotFound` if the account doesn't exist
    async fn set_reset_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Look up the account holding an unexpired reset token, without consuming it.
    async fn get_by_reset_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>>;

    /// Replace the password hash and clear the reset token and expiry.
    ///
    /// Returns `None` if no account holds the digest or `now` is past the expiry.
    async fn consume_reset_token(&self, digest: &str, password_hash: &str, now: DateTime<Utc>) -> Result<Option<Account>>;
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, email_verified, \
     email_verification_token, email_verification_expires, password_reset_token, password_reset_expires, \
     created_at, updated_at";

/// PostgreSQL-backed [`AccountStore`].
#[derive(Clone)]
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    #[instrument(skip(self, request), err)]
    async fn create(&self, request: &AccountCreateDBRequest) -> Result<Account> {
        let query = format!(
            "INSERT INTO accounts (email, password_hash, first_name, last_name, email_verification_token, email_verification_expires) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(&request.email)
            .bind(&request.password_hash)
            .bind(&request.first_name)
            .bind(&request.last_name)
            .bind(&request.verification_token_digest)
            .bind(request.verification_expires)
            .fetch_one(&self.pool)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&query).bind(id).fetch_optional(&self.pool).await?;
        Ok(account)
    }

    #[instrument(skip(self, email), err)]
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let account = sqlx::query_as::<_, Account>(&query).bind(email).fetch_optional(&self.pool).await?;
        Ok(account)
    }

    #[instrument(skip(self, digest), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn set_verification_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET email_verification_token = $2, email_verification_expires = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, digest), err)]
    async fn consume_verification_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let query = format!(
            "UPDATE accounts \
             SET email_verified = TRUE, email_verification_token = NULL, email_verification_expires = NULL, updated_at = $2 \
             WHERE email_verification_token = $1 \
               AND (email_verification_expires IS NULL OR email_verification_expires >= $2) \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(digest)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    #[instrument(skip(self, digest), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn set_reset_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accounts SET password_reset_token = $2, password_reset_expires = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(digest)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self, digest), err)]
    async fn get_by_reset_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let query =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE password_reset_token = $1 AND password_reset_expires >= $2");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(digest)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    #[instrument(skip(self, digest, password_hash), err)]
    async fn consume_reset_token(&self, digest: &str, password_hash: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let query = format!(
            "UPDATE accounts \
             SET password_hash = $2, password_reset_token = NULL, password_reset_expires = NULL, updated_at = $3 \
             WHERE password_reset_token = $1 AND password_reset_expires >= $3 \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        let account = sqlx::query_as::<_, Account>(&query)
            .bind(digest)
            .bind(password_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }
}
