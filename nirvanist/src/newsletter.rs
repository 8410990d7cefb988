//! Newsletter double opt-in.
//!
//! A subscribe request upserts the address as `pending` under a fresh UUID token and emails a
//! confirmation link. Following the link flips the row to `active`. Subscribing again before
//! confirming rotates the token, so only the most recent link works. The token is kept after
//! confirmation; replaying the link reports `already_confirmed` and changes nothing.

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    AppState,
    auth::tokens::issue_confirmation_token,
    captcha::CaptchaVerifier,
    db::{
        handlers::SubscriberStore,
        models::subscribers::{Subscriber, SubscriberConfirmation, SubscriberUpsertDBRequest},
    },
    email::EmailService,
    errors::{Error, Result},
    types::{NotificationStatus, SubscriberStatus, abbrev_uuid},
    validation::{MAX_NAME_LENGTH, required_text, required_token, validate_email},
};

pub const INVALID_CONFIRMATION_MESSAGE: &str = "This confirmation link is invalid or has already been used.";

/// Source tag recorded for subscriptions made from the registration form.
pub const REGISTRATION_SOURCE: &str = "registration";

#[derive(Debug, Clone)]
pub struct Subscription {
    pub subscriber: Subscriber,
    pub notification: NotificationStatus,
}

pub struct NewsletterService<'a> {
    subscribers: &'a dyn SubscriberStore,
    email: &'a EmailService,
    captcha: &'a CaptchaVerifier,
    default_source: &'a str,
}

impl<'a> NewsletterService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            subscribers: state.stores.subscribers.as_ref(),
            email: &state.email,
            captcha: &state.captcha,
            default_source: &state.config.newsletter.default_source,
        }
    }

    /// Public subscribe form: CAPTCHA-gated.
    #[instrument(skip_all, err)]
    pub async fn subscribe(&self, email: &str, source: Option<&str>, captcha_token: Option<&str>) -> Result<Subscription> {
        let email = validate_email(email)?;
        self.captcha.verify(captcha_token).await?;

        let source = match source.map(str::trim).filter(|s| !s.is_empty()) {
            Some(source) => required_text("Source", source, MAX_NAME_LENGTH)?,
            None => self.default_source.to_string(),
        };
        self.subscribe_verified(&email, &source).await
    }

    /// Subscribe an already validated, normalized address (no CAPTCHA).
    ///
    /// The row is committed before the email is attempted; a failed send is reported as
    /// [`NotificationStatus::Delayed`] rather than an error.
    #[instrument(skip_all, err)]
    pub async fn subscribe_verified(&self, email: &str, source: &str) -> Result<Subscription> {
        let subscriber = self
            .subscribers
            .upsert_pending(&SubscriberUpsertDBRequest {
                email: email.to_string(),
                confirmation_token: issue_confirmation_token(),
                source: source.to_string(),
            })
            .await?;

        let notification = match subscriber.confirmation_token {
            Some(token) => {
                let sent = self.email.send_newsletter_confirmation(&subscriber.email, &token).await;
                if let Err(e) = &sent {
                    warn!(subscriber_id = %abbrev_uuid(&subscriber.id), error = %e, "Newsletter confirmation email not sent");
                }
                NotificationStatus::from_send_result(&sent)
            }
            None => NotificationStatus::Delayed,
        };

        info!(subscriber_id = %abbrev_uuid(&subscriber.id), source, "Newsletter subscription pending confirmation");
        Ok(Subscription { subscriber, notification })
    }

    /// Consume a confirmation link.
    ///
    /// # Errors
    /// - `InvalidToken` if the token is malformed or matches no subscriber (including a token
    ///   superseded by a later subscribe)
    #[instrument(skip_all, err)]
    pub async fn confirm(&self, token: Option<&str>) -> Result<SubscriberConfirmation> {
        let token = required_token(token).and_then(|t| Uuid::parse_str(t).map_err(|_| invalid_confirmation()))?;

        let confirmation = self
            .subscribers
            .confirm(token, Utc::now())
            .await?
            .ok_or_else(invalid_confirmation)?;

        if confirmation.already_confirmed {
            info!(subscriber_id = %abbrev_uuid(&confirmation.subscriber.id), "Newsletter confirmation replayed");
        } else {
            info!(subscriber_id = %abbrev_uuid(&confirmation.subscriber.id), "Newsletter subscription confirmed");
        }
        Ok(confirmation)
    }

    /// Re-send the confirmation email for a pending subscriber.
    ///
    /// The caller must present the subscriber's current token, so this cannot be used to mail
    /// arbitrary addresses.
    ///
    /// # Errors
    /// - `Validation` if the email/token pair doesn't match a pending subscription
    /// - `ServiceUnavailable` if the email could not be sent
    #[instrument(skip_all, err)]
    pub async fn send_confirmation(&self, email: &str, token: &str) -> Result<()> {
        let email = validate_email(email)?;
        let token = Uuid::parse_str(required_token(Some(token))?).map_err(|_| invalid_pair())?;

        let subscriber = self.subscribers.get_by_email(&email).await?.ok_or_else(invalid_pair)?;
        if subscriber.status != SubscriberStatus::Pending || subscriber.confirmation_token != Some(token) {
            return Err(invalid_pair());
        }

        self.email.send_newsletter_confirmation(&subscriber.email, &token).await
    }
}

fn invalid_confirmation() -> Error {
    Error::InvalidToken {
        message: INVALID_CONFIRMATION_MESSAGE.to_string(),
    }
}

fn invalid_pair() -> Error {
    Error::validation("No pending subscription matches this email and token")
}
