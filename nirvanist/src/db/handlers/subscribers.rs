//! Newsletter subscriber storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::Result,
    models::subscribers::{Subscriber, SubscriberConfirmation, SubscriberRow, SubscriberUpsertDBRequest},
};

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert a pending subscriber, or reset an existing one to pending under the new token.
    ///
    /// The previous token stops matching as soon as this returns.
    async fn upsert_pending(&self, request: &SubscriberUpsertDBRequest) -> Result<Subscriber>;

    /// Look up by normalized email.
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>>;

    /// Activate the subscriber holding `token`.
    ///
    /// `confirmed_at` is set on the pending to active transition and left alone for a subscriber
    /// that is already active. The token is retained. Returns `None` if nothing matches.
    async fn confirm(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<SubscriberConfirmation>>;
}

const SUBSCRIBER_COLUMNS: &str = "id, email, status, confirmation_token, confirmed_at, source, created_at, updated_at";

/// PostgreSQL-backed [`SubscriberStore`].
#[derive(Clone)]
pub struct PostgresSubscriberStore {
    pool: PgPool,
}

impl PostgresSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ConfirmedRow {
    #[sqlx(flatten)]
    subscriber: SubscriberRow,
    previous_status: String,
}

#[async_trait]
impl SubscriberStore for PostgresSubscriberStore {
    #[instrument(skip(self, request), err)]
    async fn upsert_pending(&self, request: &SubscriberUpsertDBRequest) -> Result<Subscriber> {
        let query = format!(
            "INSERT INTO newsletter_subscribers (email, status, confirmation_token, source) \
             VALUES ($1, 'pending', $2, $3) \
             ON CONFLICT (email) DO UPDATE \
             SET status = 'pending', confirmation_token = EXCLUDED.confirmation_token, updated_at = NOW() \
             RETURNING {SUBSCRIBER_COLUMNS}"
        );

        let row = sqlx::query_as::<_, SubscriberRow>(&query)
            .bind(&request.email)
            .bind(request.confirmation_token)
            .bind(&request.source)
            .fetch_one(&self.pool)
            .await?;

        Subscriber::try_from(row)
    }

    #[instrument(skip(self, email), err)]
    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        let query = format!("SELECT {SUBSCRIBER_COLUMNS} FROM newsletter_subscribers WHERE email = $1");
        let row = sqlx::query_as::<_, SubscriberRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Subscriber::try_from).transpose()
    }

    #[instrument(skip(self, token), err)]
    async fn confirm(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<SubscriberConfirmation>> {
        let row = sqlx::query_as::<_, ConfirmedRow>(
            "UPDATE newsletter_subscribers AS s \
             SET status = 'active', \
                 confirmed_at = CASE WHEN s.status = 'active' THEN s.confirmed_at ELSE $2 END, \
                 updated_at = $2 \
             FROM ( \
                 SELECT id, status AS previous_status FROM newsletter_subscribers \
                 WHERE confirmation_token = $1 FOR UPDATE \
             ) AS prev \
             WHERE s.id = prev.id \
             RETURNING s.id, s.email, s.status, s.confirmation_token, s.confirmed_at, s.source, s.created_at, s.updated_at, \
                       prev.previous_status",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(SubscriberConfirmation {
                already_confirmed: row.previous_status == "active",
                subscriber: Subscriber::try_from(row.subscriber)?,
            })
        })
        .transpose()
    }
}
