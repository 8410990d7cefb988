//! Store traits and their PostgreSQL implementations.
//!
//! # Available Stores
//!
//! - [`AccountStore`]: Registered accounts, verification and reset tokens
//! - [`SubscriberStore`]: Newsletter double opt-in
//! - [`ContactMessageStore`]: Contact form submissions
//!
//! PostgreSQL implementations wrap a `PgPool` and use runtime-checked queries. In-memory
//! counterparts live in [`crate::db::in_memory`].

pub mod accounts;
pub mod contact_messages;
pub mod subscribers;

pub use accounts::{AccountStore, PostgresAccountStore};
pub use contact_messages::{ContactMessageStore, PostgresContactMessageStore};
pub use subscribers::{PostgresSubscriberStore, SubscriberStore};
