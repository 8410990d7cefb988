//! Contact form submission storage.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::contact_messages::{ContactMessage, ContactMessageCreateDBRequest},
};

#[async_trait]
pub trait ContactMessageStore: Send + Sync {
    async fn create(&self, request: &ContactMessageCreateDBRequest) -> Result<ContactMessage>;
}

/// PostgreSQL-backed [`ContactMessageStore`].
#[derive(Clone)]
pub struct PostgresContactMessageStore {
    pool: PgPool,
}

impl PostgresContactMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactMessageStore for PostgresContactMessageStore {
    #[instrument(skip(self, request), err)]
    async fn create(&self, request: &ContactMessageCreateDBRequest) -> Result<ContactMessage> {
        let message = sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (name, email, subject, message) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, email, subject, message, created_at",
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.subject)
        .bind(&request.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }
}
