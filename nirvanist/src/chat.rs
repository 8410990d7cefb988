//! Chatbot proxy.
//!
//! The site's chat widget posts a single message and renders whatever comes back. The reply is
//! produced by a [`ChatProvider`] chosen from [`ChatConfig`]: a fixed canned reply, or an
//! OpenAI-compatible `/chat/completions` endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::config::ChatConfig;
use crate::errors::Error;

pub const MAX_CHAT_MESSAGE_LENGTH: usize = 2000;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn reply(&self, message: &str) -> anyhow::Result<String>;
}

pub struct CannedChat {
    reply: String,
}

impl CannedChat {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

#[async_trait]
impl ChatProvider for CannedChat {
    async fn reply(&self, _message: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}

pub struct DisabledChat;

#[async_trait]
impl ChatProvider for DisabledChat {
    async fn reply(&self, _message: &str) -> anyhow::Result<String> {
        anyhow::bail!("chat provider is disabled")
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Forwards to an OpenAI-compatible chat completions API.
pub struct OpenAiChat {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
    system_prompt: Option<String>,
}

impl OpenAiChat {
    pub fn new(
        base_url: &Url,
        api_key: String,
        model: String,
        system_prompt: Option<String>,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = ensure_slash(base_url).join("chat/completions")?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            system_prompt,
        })
    }
}

/// Makes sure a url has a trailing slash so `join` appends rather than replaces the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    #[instrument(skip_all, fields(model = %self.model), err)]
    async fn reply(&self, message: &str) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: message,
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&ChatCompletionRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("chat completion returned no content"))
    }
}

pub fn create_chat_provider(config: &ChatConfig) -> anyhow::Result<Arc<dyn ChatProvider>> {
    let provider: Arc<dyn ChatProvider> = match config {
        ChatConfig::Canned { reply } => Arc::new(CannedChat::new(reply.clone())),
        ChatConfig::OpenAi {
            base_url,
            api_key,
            model,
            system_prompt,
            timeout,
        } => Arc::new(OpenAiChat::new(
            base_url,
            api_key.clone(),
            model.clone(),
            system_prompt.clone(),
            *timeout,
        )?),
        ChatConfig::Disabled => Arc::new(DisabledChat),
    };
    Ok(provider)
}

/// Validates chat input and maps provider failures onto the public error.
#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn ChatProvider>,
}

impl ChatService {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &ChatConfig) -> Result<Self, Error> {
        Ok(Self::new(create_chat_provider(config)?))
    }

    #[instrument(skip_all, err)]
    pub async fn respond(&self, message: &str) -> Result<String, Error> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::validation("Message is required"));
        }
        if message.chars().count() > MAX_CHAT_MESSAGE_LENGTH {
            return Err(Error::validation(format!(
                "Message must be at most {MAX_CHAT_MESSAGE_LENGTH} characters"
            )));
        }

        debug!(length = message.len(), "Forwarding chat message");
        self.provider.reply(message).await.map_err(|e| Error::ServiceUnavailable {
            service: "chat",
            reason: format!("{e:#}"),
            message: "Chat service unavailable",
        })
    }
}
