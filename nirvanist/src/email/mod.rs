//! Email dispatch for transactional messages.
//!
//! Delivery goes through the [`Mailer`] trait, chosen once at startup from
//! [`EmailTransportConfig`](crate::config::EmailTransportConfig):
//!
//! - [`resend::ResendMailer`]: the Resend HTTP API (production)
//! - [`transport::LettreMailer`]: SMTP relay or `.eml` files on disk
//! - [`DisabledMailer`]: no provider configured; every send fails with
//!   [`Error::ServiceUnavailable`] so the caller decides whether that matters
//!
//! [`EmailService`] wraps a mailer with the site's templates and link base. Every send is
//! best-effort from the caller's point of view: services persist first and only then dispatch.

pub mod resend;
pub mod templates;
pub mod transport;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::{Config, EmailConfig, EmailTransportConfig};
use crate::errors::Error;

/// A fully rendered message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

/// Sender identity shared by every transport.
#[derive(Debug, Clone)]
pub struct Sender {
    pub from_email: String,
    pub from_name: String,
    pub reply_to: Option<String>,
}

impl Sender {
    /// `Name <address>` form used in the `From` header
    pub fn mailbox(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }
}

impl From<&EmailConfig> for Sender {
    fn from(config: &EmailConfig) -> Self {
        Self {
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
            reply_to: config.reply_to.clone(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), Error>;
}

/// Stand-in used when no email provider is configured.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<(), Error> {
        Err(not_configured())
    }
}

pub(crate) fn not_configured() -> Error {
    Error::ServiceUnavailable {
        service: "email",
        reason: "no email transport configured (set RESEND_API_KEY or email.type)".to_string(),
        message: "Email service is not configured",
    }
}

pub(crate) fn send_failed(reason: impl Into<String>) -> Error {
    Error::ServiceUnavailable {
        service: "email",
        reason: reason.into(),
        message: "Failed to send email",
    }
}

/// Build the mailer selected by configuration.
pub fn create_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>, Error> {
    let sender = Sender::from(config);
    let mailer: Arc<dyn Mailer> = match &config.transport {
        EmailTransportConfig::Resend { api_key, base_url } => Arc::new(resend::ResendMailer::new(api_key, base_url, sender)?),
        EmailTransportConfig::Smtp { .. } | EmailTransportConfig::File { .. } => {
            Arc::new(transport::LettreMailer::new(&config.transport, sender)?)
        }
        EmailTransportConfig::Disabled => {
            tracing::warn!("No email transport configured. Verification, reset and newsletter emails will not be sent.");
            Arc::new(DisabledMailer)
        }
    };
    Ok(mailer)
}

/// Renders the site's transactional emails and hands them to the configured [`Mailer`].
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
    reply_to: Option<String>,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            mailer,
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            reply_to: config.email.reply_to.clone(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(create_mailer(&config.email)?, config))
    }

    fn link(&self, path: &str, token: &str) -> String {
        format!("{}/{path}?token={token}", self.frontend_url)
    }

    async fn dispatch(&self, to: &str, rendered: templates::Rendered) -> Result<(), Error> {
        self.mailer
            .send(OutgoingEmail {
                to: to.to_string(),
                subject: rendered.subject,
                html: rendered.html,
                reply_to: self.reply_to.clone(),
            })
            .await
    }

    #[instrument(skip_all, err)]
    pub async fn send_newsletter_confirmation(&self, to_email: &str, token: &Uuid) -> Result<(), Error> {
        let confirm_url = self.link("confirm-newsletter", &token.to_string());
        debug!(to = %to_email, "Sending newsletter confirmation email");
        self.dispatch(to_email, templates::newsletter_confirmation(&confirm_url)).await
    }

    #[instrument(skip_all, err)]
    pub async fn send_verification_email(&self, to_email: &str, first_name: &str, token: &str) -> Result<(), Error> {
        let verification_url = self.link("verify-email", token);
        debug!(to = %to_email, "Sending verification email");
        self.dispatch(to_email, templates::email_verification(first_name, &verification_url))
            .await
    }

    #[instrument(skip_all, err)]
    pub async fn send_password_reset_email(&self, to_email: &str, first_name: &str, token: &str) -> Result<(), Error> {
        let reset_url = self.link("reset-password", token);
        debug!(to = %to_email, "Sending password reset email");
        self.dispatch(to_email, templates::password_reset(first_name, &reset_url)).await
    }

    /// Copy of a contact form submission for the staff inbox, replying straight to the visitor.
    #[instrument(skip_all, err)]
    pub async fn send_contact_notification(&self, to_email: &str, message: &templates::ContactDetails<'_>) -> Result<(), Error> {
        let rendered = templates::contact_notification(message);
        self.mailer
            .send(OutgoingEmail {
                to: to_email.to_string(),
                subject: rendered.subject,
                html: rendered.html,
                reply_to: Some(message.email.to_string()),
            })
            .await
    }
}

/// In-process mailer for tests: records every message, optionally failing on demand.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<parking_lot::Mutex<Vec<OutgoingEmail>>>,
    failing: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<OutgoingEmail> {
        self.sent.lock().iter().filter(|e| e.to == to).cloned().collect()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), Error> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(send_failed("recording mailer set to fail"));
        }
        self.sent.lock().push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, extract_token};

    fn service(mailer: &RecordingMailer) -> EmailService {
        let mut config = create_test_config();
        config.frontend_url = "https://thenirvanist.com/".to_string();
        EmailService::new(Arc::new(mailer.clone()), &config)
    }

    #[tokio::test]
    async fn test_newsletter_link_uses_frontend_url() {
        let mailer = RecordingMailer::new();
        let token = Uuid::new_v4();

        service(&mailer).send_newsletter_confirmation("b@y.com", &token).await.unwrap();

        let sent = mailer.sent_to("b@y.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Welcome to The Nirvanist! Please Confirm Your Subscription");
        assert!(sent[0].html.contains(&format!("https://thenirvanist.com/confirm-newsletter?token={token}")));
        assert_eq!(extract_token(&sent[0].html, "confirm-newsletter").unwrap(), token.to_string());
    }

    #[tokio::test]
    async fn test_verification_and_reset_links() {
        let mailer = RecordingMailer::new();
        let email = service(&mailer);

        email.send_verification_email("a@x.com", "Asha", "abc123").await.unwrap();
        email.send_password_reset_email("a@x.com", "Asha", "def456").await.unwrap();

        let sent = mailer.sent_to("a@x.com");
        assert_eq!(sent[0].subject, "Verify Your Email - The Nirvanist");
        assert!(sent[0].html.contains("https://thenirvanist.com/verify-email?token=abc123"));
        assert_eq!(sent[1].subject, "Reset Your Password - The Nirvanist");
        assert!(sent[1].html.contains("https://thenirvanist.com/reset-password?token=def456"));
    }

    #[tokio::test]
    async fn test_contact_notification_replies_to_visitor() {
        let mailer = RecordingMailer::new();
        let details = templates::ContactDetails {
            name: "Mira",
            email: "mira@example.com",
            subject: "Retreat dates",
            message: "When is the next retreat?",
        };

        service(&mailer)
            .send_contact_notification("team@thenirvanist.com", &details)
            .await
            .unwrap();

        let sent = mailer.sent_to("team@thenirvanist.com");
        assert_eq!(sent[0].subject, "New contact message: Retreat dates");
        assert_eq!(sent[0].reply_to.as_deref(), Some("mira@example.com"));
    }

    #[tokio::test]
    async fn test_disabled_mailer_reports_not_configured() {
        let err = DisabledMailer
            .send(OutgoingEmail {
                to: "a@x.com".to_string(),
                subject: "s".to_string(),
                html: "h".to_string(),
                reply_to: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ServiceUnavailable { service: "email", .. }));
        assert_eq!(err.user_message(), "Email service is not configured");
    }

    #[test]
    fn test_create_mailer_for_each_transport() {
        crate::test_utils::install_crypto_provider();
        let mut config = create_test_config().email;
        assert!(create_mailer(&config).is_ok());

        config.transport = EmailTransportConfig::Resend {
            api_key: "re_test".to_string(),
            base_url: "https://api.resend.com".to_string(),
        };
        assert!(create_mailer(&config).is_ok());

        let dir = tempfile::tempdir().unwrap();
        config.transport = EmailTransportConfig::File {
            path: dir.path().join("emails").to_string_lossy().into_owned(),
        };
        assert!(create_mailer(&config).is_ok());
        assert!(dir.path().join("emails").exists());
    }

    #[test]
    fn test_sender_mailbox() {
        let sender = Sender::from(&EmailConfig::default());
        assert_eq!(sender.mailbox(), "The Nirvanist <noreply@thenirvanist.com>");
    }
}
