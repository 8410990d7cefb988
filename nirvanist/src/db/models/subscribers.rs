//! Database models for newsletter subscribers.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::errors::DbError;
use crate::types::{SubscriberId, SubscriberStatus};

/// Row as stored; `status` is plain text in the table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub id: SubscriberId,
    pub email: String,
    pub status: String,
    pub confirmation_token: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Newsletter subscriber, independent of any account
#[derive(Debug, Clone, PartialEq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub email: String,
    pub status: SubscriberStatus,
    pub confirmation_token: Option<Uuid>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = DbError;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<SubscriberStatus>().map_err(|e| DbError::Other(anyhow::anyhow!(e)))?;
        Ok(Self {
            id: row.id,
            email: row.email,
            status,
            confirmation_token: row.confirmation_token,
            confirmed_at: row.confirmed_at,
            source: row.source,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Request for inserting or re-pending a subscriber
#[derive(Debug, Clone)]
pub struct SubscriberUpsertDBRequest {
    /// Already normalized
    pub email: String,
    pub confirmation_token: Uuid,
    /// Recorded only when the row is first created
    pub source: String,
}

/// Result of consuming a confirmation token
#[derive(Debug, Clone)]
pub struct SubscriberConfirmation {
    pub subscriber: Subscriber,
    /// The subscriber was already active before this confirmation
    pub already_confirmed: bool,
}
