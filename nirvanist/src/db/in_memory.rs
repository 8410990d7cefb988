//! In-memory store implementations.
//!
//! These keep everything in process-local maps behind a lock. They back the test suite and the
//! `database.type: memory` development mode, with the same uniqueness and single-use semantics
//! as the PostgreSQL stores. Data is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{AccountStore, ContactMessageStore, SubscriberStore},
        models::{
            accounts::{Account, AccountCreateDBRequest},
            contact_messages::{ContactMessage, ContactMessageCreateDBRequest},
            subscribers::{Subscriber, SubscriberConfirmation, SubscriberUpsertDBRequest},
        },
    },
    types::{AccountId, SubscriberStatus},
};

/// In-memory implementation of [`AccountStore`].
#[derive(Clone, Default)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored account.
    pub fn all(&self) -> Vec<Account> {
        self.accounts.read().values().cloned().collect()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn create(&self, request: &AccountCreateDBRequest) -> Result<Account> {
        let mut accounts = self.accounts.write();

        if accounts.values().any(|a| a.email == request.email) {
            return Err(DbError::UniqueViolation {
                constraint: Some("accounts_email_key".to_string()),
                table: Some("accounts".to_string()),
                message: format!("duplicate key value violates unique constraint for email {}", request.email),
            });
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email_verified: false,
            email_verification_token: Some(request.verification_token_digest.clone()),
            email_verification_expires: Some(request.verification_expires),
            password_reset_token: None,
            password_reset_expires: None,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().values().find(|a| a.email == email).cloned())
    }

    async fn set_verification_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).ok_or(DbError::NotFound)?;
        account.email_verification_token = Some(digest.to_string());
        account.email_verification_expires = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn consume_verification_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let mut accounts = self.accounts.write();
        let Some(account) = accounts.values_mut().find(|a| {
            a.email_verification_token.as_deref() == Some(digest) && a.email_verification_expires.is_none_or(|expires| expires >= now)
        }) else {
            return Ok(None);
        };

        account.email_verified = true;
        account.email_verification_token = None;
        account.email_verification_expires = None;
        account.updated_at = now;
        Ok(Some(account.clone()))
    }

    async fn set_reset_token(&self, id: AccountId, digest: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut accounts = self.accounts.write();
        let account = accounts.get_mut(&id).ok_or(DbError::NotFound)?;
        account.password_reset_token = Some(digest.to_string());
        account.password_reset_expires = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn get_by_reset_token(&self, digest: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.password_reset_token.as_deref() == Some(digest) && a.password_reset_expires.is_some_and(|expires| expires >= now))
            .cloned())
    }

    async fn consume_reset_token(&self, digest: &str, password_hash: &str, now: DateTime<Utc>) -> Result<Option<Account>> {
        let mut accounts = self.accounts.write();
        let Some(account) = accounts.values_mut().find(|a| {
            a.password_reset_token.as_deref() == Some(digest) && a.password_reset_expires.is_some_and(|expires| expires >= now)
        }) else {
            return Ok(None);
        };

        account.password_hash = password_hash.to_string();
        account.password_reset_token = None;
        account.password_reset_expires = None;
        account.updated_at = now;
        Ok(Some(account.clone()))
    }
}

/// In-memory implementation of [`SubscriberStore`].
#[derive(Clone, Default)]
pub struct InMemorySubscriberStore {
    subscribers: Arc<RwLock<HashMap<String, Subscriber>>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn upsert_pending(&self, request: &SubscriberUpsertDBRequest) -> Result<Subscriber> {
        let mut subscribers = self.subscribers.write();
        let now = Utc::now();

        let subscriber = subscribers
            .entry(request.email.clone())
            .and_modify(|s| {
                s.status = SubscriberStatus::Pending;
                s.confirmation_token = Some(request.confirmation_token);
                s.updated_at = now;
            })
            .or_insert_with(|| Subscriber {
                id: Uuid::new_v4(),
                email: request.email.clone(),
                status: SubscriberStatus::Pending,
                confirmation_token: Some(request.confirmation_token),
                confirmed_at: None,
                source: request.source.clone(),
                created_at: now,
                updated_at: now,
            });

        Ok(subscriber.clone())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>> {
        Ok(self.subscribers.read().get(email).cloned())
    }

    async fn confirm(&self, token: Uuid, now: DateTime<Utc>) -> Result<Option<SubscriberConfirmation>> {
        let mut subscribers = self.subscribers.write();
        let Some(subscriber) = subscribers.values_mut().find(|s| s.confirmation_token == Some(token)) else {
            return Ok(None);
        };

        let already_confirmed = subscriber.status == SubscriberStatus::Active;
        if !already_confirmed {
            subscriber.status = SubscriberStatus::Active;
            subscriber.confirmed_at = Some(now);
        }
        subscriber.updated_at = now;

        Ok(Some(SubscriberConfirmation {
            subscriber: subscriber.clone(),
            already_confirmed,
        }))
    }
}

/// In-memory implementation of [`ContactMessageStore`].
#[derive(Clone, Default)]
pub struct InMemoryContactMessageStore {
    messages: Arc<RwLock<Vec<ContactMessage>>>,
}

impl InMemoryContactMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<ContactMessage> {
        self.messages.read().clone()
    }
}

#[async_trait]
impl ContactMessageStore for InMemoryContactMessageStore {
    async fn create(&self, request: &ContactMessageCreateDBRequest) -> Result<ContactMessage> {
        let message = ContactMessage {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            email: request.email.clone(),
            subject: request.subject.clone(),
            message: request.message.clone(),
            created_at: Utc::now(),
        };
        self.messages.write().push(message.clone());
        Ok(message)
    }
}
