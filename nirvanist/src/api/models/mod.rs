//! Request/response models for the HTTP API.
//!
//! Field names are camelCase on the wire. Request bodies default every field, so a missing field
//! surfaces as the same validation message as an empty one rather than a deserialization error.
//!
//! - [`auth`]: Registration, login, verification and password reset
//! - [`newsletter`]: Subscription and confirmation
//! - [`contact`]: Contact form
//! - [`chat`]: Chatbot proxy

pub mod auth;
pub mod chat;
pub mod contact;
pub mod newsletter;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body for responses that only carry a human-readable message
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
