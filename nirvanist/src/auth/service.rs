//! Account lifecycle: registration, login, email verification and password reset.
//!
//! Every flow persists its state change before attempting email. A failed send never rolls
//! back the change; registration reports it through [`NotificationStatus`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    AppState,
    auth::{
        password::{self, Argon2Params},
        session::SessionIssuer,
        tokens::{issue_opaque_token, token_digest},
    },
    captcha::CaptchaVerifier,
    config::AuthConfig,
    db::{
        errors::DbError,
        handlers::AccountStore,
        models::accounts::{Account, AccountCreateDBRequest},
    },
    email::EmailService,
    errors::{Error, Result},
    newsletter::{NewsletterService, REGISTRATION_SOURCE},
    types::{AccountId, NotificationStatus, abbrev_uuid},
    validation::{MAX_NAME_LENGTH, required_text, required_token, validate_email, validate_password},
};

pub const ALREADY_EXISTS_MESSAGE: &str = "User already exists with this email";
pub const INVALID_VERIFICATION_MESSAGE: &str = "Invalid verification token";
pub const FORGOT_PASSWORD_MESSAGE: &str = "If an account with that email exists, a password reset link has been sent.";
pub const RESEND_VERIFICATION_MESSAGE: &str =
    "If an account with that email exists and is not yet verified, a new verification link has been sent.";

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub captcha_token: Option<String>,
    pub subscribe_newsletter: bool,
}

/// A newly created account and the session issued for it.
#[derive(Debug, Clone)]
pub struct Registered {
    pub account: Account,
    pub token: String,
    /// Delivery of the verification email
    pub notification: NotificationStatus,
}

#[derive(Debug, Clone)]
pub struct LoggedIn {
    pub account: Account,
    pub token: String,
}

pub struct AuthService<'a> {
    config: &'a AuthConfig,
    accounts: &'a dyn AccountStore,
    sessions: &'a SessionIssuer,
    email: &'a EmailService,
    captcha: &'a CaptchaVerifier,
    newsletter: NewsletterService<'a>,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            config: &state.config.auth,
            accounts: state.stores.accounts.as_ref(),
            sessions: &state.sessions,
            email: &state.email,
            captcha: &state.captcha,
            newsletter: NewsletterService::new(state),
        }
    }

    fn argon2_params(&self) -> Argon2Params {
        Argon2Params::from(&self.config.password)
    }

    /// Create an account, email a verification link and issue a session straight away.
    ///
    /// # Errors
    /// - `Forbidden` if self-registration is switched off
    /// - `Validation` for malformed input
    /// - `CaptchaFailed` per the CAPTCHA policy
    /// - `AlreadyExists` if the normalized email is taken; nothing is written
    #[instrument(skip_all, err)]
    pub async fn register(&self, registration: Registration) -> Result<Registered> {
        if !self.config.allow_registration {
            return Err(Error::Forbidden {
                message: "User registration is disabled".to_string(),
            });
        }

        let email = validate_email(&registration.email)?;
        validate_password(&registration.password, &self.config.password)?;
        let first_name = required_text("First name", &registration.first_name, MAX_NAME_LENGTH)?;
        let last_name = required_text("Last name", &registration.last_name, MAX_NAME_LENGTH)?;
        self.captcha.verify(registration.captcha_token.as_deref()).await?;

        if self.accounts.get_by_email(&email).await?.is_some() {
            return Err(already_exists());
        }

        let password_hash = password::hash_password_blocking(registration.password, self.argon2_params()).await?;
        let verification_token = issue_opaque_token();

        let account = self
            .accounts
            .create(&AccountCreateDBRequest {
                email,
                password_hash,
                first_name,
                last_name,
                verification_token_digest: token_digest(&verification_token),
                verification_expires: expires_after(self.config.email_verification_token_duration)?,
            })
            .await
            .map_err(|e: DbError| {
                if e.is_unique_violation_on("accounts") {
                    already_exists()
                } else {
                    Error::Database(e)
                }
            })?;
        info!(account_id = %abbrev_uuid(&account.id), "Account registered");

        let sent = self
            .email
            .send_verification_email(&account.email, &account.first_name, &verification_token)
            .await;
        if let Err(e) = &sent {
            warn!(account_id = %abbrev_uuid(&account.id), error = %e, "Verification email not sent");
        }
        let notification = NotificationStatus::from_send_result(&sent);

        let token = self.sessions.issue(account.id)?;

        if registration.subscribe_newsletter
            && let Err(e) = self.newsletter.subscribe_verified(&account.email, REGISTRATION_SOURCE).await
        {
            warn!(account_id = %abbrev_uuid(&account.id), error = %e, "Newsletter opt-in at registration failed");
        }

        Ok(Registered {
            account,
            token,
            notification,
        })
    }

    /// Check credentials and issue a session.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password, indistinguishably
    /// - `EmailNotVerified` when the password matched, the account is unverified and the
    ///   verified-login policy is on
    #[instrument(skip_all, err)]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoggedIn> {
        let email = validate_email(email).map_err(|_| Error::InvalidCredentials)?;
        if password.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let Some(account) = self.accounts.get_by_email(&email).await? else {
            let password = password.to_string();
            let params = self.argon2_params();
            tokio::task::spawn_blocking(move || password::verify_against_dummy(&password, params))
                .await
                .map_err(|e| Error::Internal {
                    operation: format!("spawn password verification task: {e}"),
                })?;
            debug!("Login attempt for unknown email");
            return Err(Error::InvalidCredentials);
        };

        let matches = password::verify_password_blocking(password.to_string(), account.password_hash.clone()).await?;
        if !matches {
            debug!(account_id = %abbrev_uuid(&account.id), "Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        if self.config.require_verified_email_for_login && !account.email_verified {
            return Err(Error::EmailNotVerified);
        }

        let token = self.sessions.issue(account.id)?;
        info!(account_id = %abbrev_uuid(&account.id), "Login successful");
        Ok(LoggedIn { account, token })
    }

    /// Consume an emailed verification token.
    ///
    /// # Errors
    /// - `InvalidToken` if the token matches nothing, was already used or has expired
    #[instrument(skip_all, err)]
    pub async fn verify_email(&self, token: Option<&str>) -> Result<Account> {
        let token = required_token(token).map_err(|_| invalid_verification())?;

        let account = self
            .accounts
            .consume_verification_token(&token_digest(token), Utc::now())
            .await?
            .ok_or_else(invalid_verification)?;

        info!(account_id = %abbrev_uuid(&account.id), "Email verified");
        Ok(account)
    }

    /// Issue a fresh verification link, replacing the previous one.
    ///
    /// Succeeds identically whether or not the account exists or is already verified.
    #[instrument(skip_all, err)]
    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        let email = validate_email(email)?;

        let Some(account) = self.accounts.get_by_email(&email).await? else {
            debug!("Verification resend requested for unknown email");
            return Ok(());
        };
        if account.email_verified {
            debug!(account_id = %abbrev_uuid(&account.id), "Verification resend requested for verified account");
            return Ok(());
        }

        let token = issue_opaque_token();
        self.accounts
            .set_verification_token(
                account.id,
                &token_digest(&token),
                expires_after(self.config.email_verification_token_duration)?,
            )
            .await?;

        if let Err(e) = self.email.send_verification_email(&account.email, &account.first_name, &token).await {
            warn!(account_id = %abbrev_uuid(&account.id), error = %e, "Verification email not sent");
        }
        Ok(())
    }

    /// Start a password reset.
    ///
    /// Succeeds identically whether or not the account exists. A later request replaces the
    /// earlier token.
    #[instrument(skip_all, err)]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = validate_email(email)?;

        let Some(account) = self.accounts.get_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = issue_opaque_token();
        self.accounts
            .set_reset_token(
                account.id,
                &token_digest(&token),
                expires_after(self.config.password_reset_token_duration)?,
            )
            .await?;

        if let Err(e) = self.email.send_password_reset_email(&account.email, &account.first_name, &token).await {
            warn!(account_id = %abbrev_uuid(&account.id), error = %e, "Password reset email not sent");
        } else {
            info!(account_id = %abbrev_uuid(&account.id), "Password reset email sent");
        }
        Ok(())
    }

    /// Complete a password reset.
    ///
    /// # Errors
    /// - `Validation` if the new password breaks the password policy
    /// - `InvalidOrExpiredToken` if the token is unknown, already used or expired (not
    ///   distinguished)
    #[instrument(skip_all, err)]
    pub async fn reset_password(&self, token: Option<&str>, new_password: &str) -> Result<Account> {
        let token = required_token(token).map_err(|_| Error::InvalidOrExpiredToken)?;
        validate_password(new_password, &self.config.password)?;
        let digest = token_digest(token);

        // Reject unknown or expired tokens before hashing
        self.accounts
            .get_by_reset_token(&digest, Utc::now())
            .await?
            .ok_or(Error::InvalidOrExpiredToken)?;

        let password_hash = password::hash_password_blocking(new_password.to_string(), self.argon2_params()).await?;
        let account = self
            .accounts
            .consume_reset_token(&digest, &password_hash, Utc::now())
            .await?
            .ok_or(Error::InvalidOrExpiredToken)?;

        info!(account_id = %abbrev_uuid(&account.id), "Password reset completed");
        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&account_id)), err)]
    pub async fn profile(&self, account_id: AccountId) -> Result<Account> {
        self.accounts.get_by_id(account_id).await?.ok_or_else(|| Error::NotFound {
            resource: "User".to_string(),
        })
    }
}

fn already_exists() -> Error {
    Error::AlreadyExists {
        message: ALREADY_EXISTS_MESSAGE.to_string(),
    }
}

fn invalid_verification() -> Error {
    Error::InvalidToken {
        message: INVALID_VERIFICATION_MESSAGE.to_string(),
    }
}

fn expires_after(lifetime: Duration) -> Result<DateTime<Utc>> {
    let lifetime = chrono::Duration::from_std(lifetime).map_err(|e| Error::Internal {
        operation: format!("compute token expiry: {e}"),
    })?;
    Ok(Utc::now() + lifetime)
}
