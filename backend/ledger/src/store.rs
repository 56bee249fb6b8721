//! # Stores
//!
//! Backend seams. The server plugs Redis in behind these, tests and the tester
//! use [`crate::memory`].
//!
//! ## Record store
//! - create-in-namespace: assigns the record id, appends in insertion order
//! - list-namespace: insertion order, an untouched namespace lists as empty
//! - delete-by-id: [`StoreError::NotFound`] if the id is not in that namespace
//!
//! ## Account store
//! - accounts: email to Argon2 PHC string, insert fails if present
//! - sessions: token hash to email, with expiry
//! - resets: code hash to email, with expiry, consumed on read
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    contact::{ContactRecord, RecordId, ValidContact},
    error::StoreError,
    identity::{Email, Namespace, ResetCode},
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(
        &self,
        namespace: &Namespace,
        contact: ValidContact,
    ) -> Result<ContactRecord, StoreError>;

    async fn list(&self, namespace: &Namespace) -> Result<Vec<ContactRecord>, StoreError>;

    async fn delete(&self, namespace: &Namespace, id: RecordId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Returns `false` when the email already has an account.
    async fn insert_account(&self, email: &Email, password_hash: &str) -> Result<bool, StoreError>;

    async fn password_hash(&self, email: &Email) -> Result<Option<String>, StoreError>;

    async fn set_password_hash(&self, email: &Email, password_hash: &str) -> Result<(), StoreError>;

    async fn put_session(
        &self,
        token_hash: &str,
        email: &Email,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Unknown and expired sessions both resolve to `None`.
    async fn session(&self, token_hash: &str) -> Result<Option<Email>, StoreError>;

    async fn remove_session(&self, token_hash: &str) -> Result<Option<Email>, StoreError>;

    async fn put_reset(&self, code_hash: &str, email: &Email, ttl: Duration)
    -> Result<(), StoreError>;

    /// Single use: a code is gone after the first take.
    async fn take_reset(&self, code_hash: &str) -> Result<Option<Email>, StoreError>;
}

/// Delivery of password-reset codes to their owner.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn deliver_reset(&self, email: &Email, code: &ResetCode) -> Result<(), StoreError>;
}
