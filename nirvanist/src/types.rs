//! Common type definitions shared across the service.
//!
//! # ID Types
//!
//! Entity IDs are UUIDs wrapped in type aliases for readability:
//!
//! - [`AccountId`]: Registered account identifier
//! - [`SubscriberId`]: Newsletter subscriber identifier
//! - [`ContactMessageId`]: Stored contact form submission identifier
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging
//! - [`normalize_email`]: Canonical form used for every email lookup

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type AccountId = Uuid;
pub type SubscriberId = Uuid;
pub type ContactMessageId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Trim and lowercase an email address.
///
/// Accounts and subscribers are keyed by this form, so `A@X.com ` and `a@x.com` are the same
/// identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Lifecycle of a newsletter subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Awaiting confirmation via the emailed link
    Pending,
    /// Confirmed (double opt-in complete)
    Active,
}

impl SubscriberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriberStatus::Pending => "pending",
            SubscriberStatus::Active => "active",
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriberStatus::Pending),
            "active" => Ok(SubscriberStatus::Active),
            other => Err(format!("unknown subscriber status: {other}")),
        }
    }
}

/// Outcome of the best-effort email that follows a committed state change.
///
/// `Delayed` tells the client the change was saved but the notification could not be
/// dispatched right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Delayed,
}

impl NotificationStatus {
    pub fn from_send_result<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Delayed
        }
    }
}
