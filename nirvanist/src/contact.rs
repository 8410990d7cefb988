//! Contact form submissions.

use tracing::{info, instrument, warn};

use crate::{
    AppState,
    captcha::CaptchaVerifier,
    db::{
        handlers::ContactMessageStore,
        models::contact_messages::{ContactMessage, ContactMessageCreateDBRequest},
    },
    email::{EmailService, templates::ContactDetails},
    errors::{Error, Result},
    types::abbrev_uuid,
    validation::{MAX_CONTACT_MESSAGE_LENGTH, MAX_NAME_LENGTH, MAX_SUBJECT_LENGTH, required_text, validate_email},
};

pub const CONTACT_SUCCESS_MESSAGE: &str = "Thank you for your message. We will get back to you soon!";

#[derive(Debug, Clone)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub captcha_token: Option<String>,
}

pub struct ContactService<'a> {
    messages: &'a dyn ContactMessageStore,
    email: &'a EmailService,
    captcha: &'a CaptchaVerifier,
    notify_email: Option<&'a str>,
}

impl<'a> ContactService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            messages: state.stores.contact_messages.as_ref(),
            email: &state.email,
            captcha: &state.captcha,
            notify_email: state.config.contact.notify_email.as_deref(),
        }
    }

    /// Validate, persist and (if configured) forward a submission to the staff inbox.
    ///
    /// # Errors
    /// - `Validation` for missing or oversized fields
    /// - `CaptchaFailed` per the CAPTCHA policy
    /// - `ServiceUnavailable` ("Failed to send message") if the message could not be stored
    #[instrument(skip_all, err)]
    pub async fn submit(&self, submission: ContactSubmission) -> Result<ContactMessage> {
        let request = ContactMessageCreateDBRequest {
            name: required_text("Name", &submission.name, MAX_NAME_LENGTH)?,
            email: validate_email(&submission.email)?,
            subject: required_text("Subject", &submission.subject, MAX_SUBJECT_LENGTH)?,
            message: required_text("Message", &submission.message, MAX_CONTACT_MESSAGE_LENGTH)?,
        };
        self.captcha.verify(submission.captcha_token.as_deref()).await?;

        let stored = self.messages.create(&request).await.map_err(|e| Error::ServiceUnavailable {
            service: "contact",
            reason: format!("store contact message: {e}"),
            message: "Failed to send message",
        })?;
        info!(message_id = %abbrev_uuid(&stored.id), "Contact message received");

        if let Some(notify_email) = self.notify_email {
            let details = ContactDetails {
                name: &stored.name,
                email: &stored.email,
                subject: &stored.subject,
                message: &stored.message,
            };
            if let Err(e) = self.email.send_contact_notification(notify_email, &details).await {
                warn!(message_id = %abbrev_uuid(&stored.id), error = %e, "Contact notification email not sent");
            }
        }

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_context};

    fn submission() -> ContactSubmission {
        ContactSubmission {
            name: " Mira ".to_string(),
            email: "Mira@Example.com".to_string(),
            subject: "Retreat dates".to_string(),
            message: "When is the next retreat in Rishikesh?".to_string(),
            captcha_token: None,
        }
    }

    #[tokio::test]
    async fn test_submission_is_persisted() {
        let ctx = create_test_context(create_test_config());

        let stored = ContactService::new(&ctx.state).submit(submission()).await.unwrap();

        assert_eq!(stored.name, "Mira");
        assert_eq!(stored.email, "mira@example.com");
        assert_eq!(ctx.contact_messages.all().len(), 1);
        assert!(ctx.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_staff_notification_when_configured() {
        let mut config = create_test_config();
        config.contact.notify_email = Some("team@thenirvanist.com".to_string());
        let ctx = create_test_context(config);

        ContactService::new(&ctx.state).submit(submission()).await.unwrap();

        let sent = ctx.mailer.sent_to("team@thenirvanist.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New contact message: Retreat dates");
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_submission() {
        let mut config = create_test_config();
        config.contact.notify_email = Some("team@thenirvanist.com".to_string());
        let ctx = create_test_context(config);
        ctx.mailer.set_failing(true);

        assert!(ContactService::new(&ctx.state).submit(submission()).await.is_ok());
        assert_eq!(ctx.contact_messages.all().len(), 1);
    }

    #[tokio::test]
    async fn test_every_field_is_required() {
        let ctx = create_test_context(create_test_config());
        let service = ContactService::new(&ctx.state);

        let mut missing_name = submission();
        missing_name.name = "  ".to_string();
        assert_eq!(service.submit(missing_name).await.unwrap_err().user_message(), "Name is required");

        let mut missing_message = submission();
        missing_message.message = String::new();
        assert_eq!(service.submit(missing_message).await.unwrap_err().user_message(), "Message is required");

        let mut bad_email = submission();
        bad_email.email = "mira".to_string();
        assert!(matches!(service.submit(bad_email).await, Err(Error::Validation { .. })));

        let mut long_message = submission();
        long_message.message = "m".repeat(MAX_CONTACT_MESSAGE_LENGTH + 1);
        assert!(service.submit(long_message).await.is_err());

        assert!(ctx.contact_messages.all().is_empty());
    }

    struct FailingContactStore;

    #[async_trait::async_trait]
    impl ContactMessageStore for FailingContactStore {
        async fn create(&self, _request: &ContactMessageCreateDBRequest) -> crate::db::errors::Result<ContactMessage> {
            Err(crate::db::errors::DbError::Other(anyhow::anyhow!("connection reset")))
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic_500() {
        let mut stores = crate::db::Stores::in_memory();
        stores.contact_messages = std::sync::Arc::new(FailingContactStore);
        let (state, _mailer) = crate::test_utils::create_test_state_with_stores(create_test_config(), stores);

        let err = ContactService::new(&state).submit(submission()).await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to send message");
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
