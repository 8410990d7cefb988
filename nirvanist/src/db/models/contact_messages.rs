//! Database models for contact form submissions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::types::ContactMessageId;

#[derive(Debug, Clone, FromRow)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ContactMessageCreateDBRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}
