//! Delivery through the Resend HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Mailer, OutgoingEmail, Sender, send_failed};
use crate::errors::Error;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

pub struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    reply_to: Option<String>,
}

impl ResendMailer {
    pub fn new(api_key: &str, base_url: &str, sender: Sender) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal {
                operation: format!("create Resend HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/emails", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            from: sender.mailbox(),
            reply_to: sender.reply_to,
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    #[instrument(skip_all, fields(subject = %email.subject), err)]
    async fn send(&self, email: OutgoingEmail) -> Result<(), Error> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
            reply_to: email.reply_to.as_deref().or(self.reply_to.as_deref()),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_failed(format!("Resend request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(send_failed(format!("Resend returned {status}: {body}")));
        }

        let sent: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| send_failed(format!("unexpected Resend response: {e}")))?;
        debug!(email_id = %sent.id, "Email accepted by Resend");
        Ok(())
    }
}
