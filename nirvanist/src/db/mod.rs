//! Storage layer.
//!
//! Each entity is reached through an injected store trait with two implementations: a
//! PostgreSQL one (the managed Supabase database in production) and an in-memory one used by
//! tests and local development.
//!
//! ```text
//! ┌─────────────┐
//! │  Services   │  (auth::service, newsletter, contact)
//! └──────┬──────┘
//!        │  Arc<dyn ...Store>
//!        ↓
//! ┌─────────────┐     ┌──────────────┐
//! │  Postgres   │  or │  In-memory   │
//! └─────────────┘     └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Store traits and their PostgreSQL implementations
//! - [`in_memory`]: In-memory implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Storage error types
//!
//! # Migrations
//!
//! Migrations live in the crate's `migrations/` directory and are applied at startup by
//! [`crate::migrator`] unless `database.run_migrations` is off.

pub mod errors;
pub mod handlers;
pub mod in_memory;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::config::{Config, DatabaseConfig, PoolSettings};
use handlers::{
    AccountStore, ContactMessageStore, PostgresAccountStore, PostgresContactMessageStore, PostgresSubscriberStore, SubscriberStore,
};
use in_memory::{InMemoryAccountStore, InMemoryContactMessageStore, InMemorySubscriberStore};

/// The set of stores handed to the services.
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub contact_messages: Arc<dyn ContactMessageStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PostgresAccountStore::new(pool.clone())),
            subscribers: Arc::new(PostgresSubscriberStore::new(pool.clone())),
            contact_messages: Arc::new(PostgresContactMessageStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(InMemoryAccountStore::new()),
            subscribers: Arc::new(InMemorySubscriberStore::new()),
            contact_messages: Arc::new(InMemoryContactMessageStore::new()),
        }
    }
}

/// Open the configured storage backend, running migrations for PostgreSQL.
///
/// Returns the pool alongside the stores so the caller can close it on shutdown.
pub async fn setup_database(config: &Config) -> anyhow::Result<(Stores, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::Postgres {
            url,
            pool,
            run_migrations,
        } => {
            info!("Using PostgreSQL storage");
            let pg_pool = create_pool(url, pool).await?;

            if *run_migrations {
                crate::migrator().run(&pg_pool).await?;
                info!("Database migrations applied");
            }

            Ok((Stores::postgres(pg_pool.clone()), Some(pg_pool)))
        }
        DatabaseConfig::Memory => {
            info!("Using in-memory storage: data will be lost on shutdown");
            Ok((Stores::in_memory(), None))
        }
    }
}

async fn create_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }

    Ok(options.connect(url).await?)
}
