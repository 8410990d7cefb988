//! SMTP and file delivery via lettre.

use async_trait::async_trait;
use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::path::Path;

use super::{Mailer, OutgoingEmail, Sender, send_failed};
use crate::{config::EmailTransportConfig, errors::Error};

pub struct LettreMailer {
    transport: LettreTransport,
    sender: Sender,
}

enum LettreTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl LettreMailer {
    pub fn new(config: &EmailTransportConfig, sender: Sender) -> Result<Self, Error> {
        let transport = match config {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                LettreTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                LettreTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
            EmailTransportConfig::Resend { .. } | EmailTransportConfig::Disabled => {
                return Err(Error::Internal {
                    operation: "create lettre transport: only smtp and file transports are supported".to_string(),
                });
            }
        };

        Ok(Self { transport, sender })
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, Error> {
        let from = self.sender.mailbox().parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse from email: {e}"),
        })?;

        let to = email.to.parse::<Mailbox>().map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let mut builder = Message::builder().from(from).to(to).subject(&email.subject);

        if let Some(reply_to) = email.reply_to.as_deref().or(self.sender.reply_to.as_deref()) {
            let reply_to = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }

        builder
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| Error::Internal {
                operation: format!("build email message: {e}"),
            })
    }
}

#[async_trait]
impl Mailer for LettreMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), Error> {
        let message = self.build_message(&email)?;

        match &self.transport {
            LettreTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| send_failed(format!("send SMTP email: {e}")))?;
            }
            LettreTransport::File(file) => {
                file.send(message).await.map_err(|e| send_failed(format!("send file email: {e}")))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmailConfig;

    fn outgoing(reply_to: Option<&str>) -> OutgoingEmail {
        OutgoingEmail {
            to: "seeker@example.com".to_string(),
            subject: "Reset Your Password - The Nirvanist".to_string(),
            html: "<p>reset link</p>".to_string(),
            reply_to: reply_to.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_file_transport_writes_eml() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmailTransportConfig::File {
            path: dir.path().to_string_lossy().into_owned(),
        };
        let mailer = LettreMailer::new(&config, Sender::from(&EmailConfig::default())).unwrap();

        mailer.send(outgoing(Some("visitor@example.com"))).await.unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().filter_map(|e| e.ok()).collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].path()).unwrap();
        assert!(contents.contains("Subject: Reset Your Password - The Nirvanist"));
        assert!(contents.contains("noreply@thenirvanist.com"));
        assert!(contents.contains("Reply-To: visitor@example.com"));
    }

    #[test]
    fn test_invalid_recipient_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmailTransportConfig::File {
            path: dir.path().to_string_lossy().into_owned(),
        };
        let mailer = LettreMailer::new(&config, Sender::from(&EmailConfig::default())).unwrap();

        let mut email = outgoing(None);
        email.to = "not an address".to_string();
        assert!(matches!(mailer.build_message(&email), Err(Error::Internal { .. })));
    }

    #[test]
    fn test_resend_config_is_not_a_lettre_transport() {
        let config = EmailTransportConfig::Resend {
            api_key: "re_x".to_string(),
            base_url: "https://api.resend.com".to_string(),
        };
        assert!(LettreMailer::new(&config, Sender::from(&EmailConfig::default())).is_err());
    }

    #[tokio::test]
    async fn test_smtp_transport_builds() {
        let config = EmailTransportConfig::Smtp {
            host: "localhost".to_string(),
            port: 2525,
            username: "user".to_string(),
            password: "pass".to_string(),
            use_tls: false,
        };
        assert!(LettreMailer::new(&config, Sender::from(&EmailConfig::default())).is_ok());
    }
}
