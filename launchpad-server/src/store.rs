//! Waitlist subscriber storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use launchpad_mail::Address;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Subscriber store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// One waitlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscriber {
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

/// Subscriber storage used by the waitlist and campaign endpoints.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Add an address. Returns `false` when it was already subscribed.
    async fn add(&self, email: &Address) -> Result<bool, StoreError>;

    /// All subscribers in signup order.
    async fn list(&self) -> Result<Vec<Subscriber>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

/// Process-local store; addresses are unique ignoring case.
#[derive(Debug, Default)]
pub struct InMemorySubscriberStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<String>,
    subscribers: Vec<Subscriber>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn add(&self, email: &Address) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        if !inner.seen.insert(email.normalized()) {
            return Ok(false);
        }
        inner.subscribers.push(Subscriber {
            email: email.email().to_string(),
            subscribed_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Subscriber>, StoreError> {
        Ok(self.inner.read().subscribers.clone())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().subscribers.len())
    }
}
