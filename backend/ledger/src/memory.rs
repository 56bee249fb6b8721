//! In-memory backends. Used by tests, by `tester local`, and by the server when
//! `STORE_BACKEND=memory`.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    contact::{ContactRecord, RecordId, ValidContact},
    error::StoreError,
    identity::{Email, Namespace, ResetCode},
    store::{AccountStore, Outbox, RecordStore},
};

#[derive(Default)]
pub struct MemoryRecordStore {
    namespaces: RwLock<HashMap<Namespace, Vec<ContactRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(
        &self,
        namespace: &Namespace,
        contact: ValidContact,
    ) -> Result<ContactRecord, StoreError> {
        let record = contact.into_record(Uuid::new_v4(), Utc::now());

        self.namespaces
            .write()
            .await
            .entry(namespace.clone())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<ContactRecord>, StoreError> {
        Ok(self
            .namespaces
            .read()
            .await
            .get(namespace)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete(&self, namespace: &Namespace, id: RecordId) -> Result<(), StoreError> {
        let mut namespaces = self.namespaces.write().await;
        let records = namespaces
            .get_mut(namespace)
            .ok_or(StoreError::NotFound(id))?;

        let position = records
            .iter()
            .position(|record| record.id == id)
            .ok_or(StoreError::NotFound(id))?;
        records.remove(position);

        Ok(())
    }
}

struct Expiring {
    email: Email,
    expires_at: Instant,
}

impl Expiring {
    fn new(email: &Email, ttl: Duration) -> Self {
        Self {
            email: email.clone(),
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Default)]
struct Accounts {
    passwords: HashMap<Email, String>,
    sessions: HashMap<String, Expiring>,
    resets: HashMap<String, Expiring>,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    inner: Mutex<Accounts>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert_account(&self, email: &Email, password_hash: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.passwords.contains_key(email) {
            return Ok(false);
        }
        inner
            .passwords
            .insert(email.clone(), password_hash.to_string());

        Ok(true)
    }

    async fn password_hash(&self, email: &Email) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().await.passwords.get(email).cloned())
    }

    async fn set_password_hash(&self, email: &Email, password_hash: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .passwords
            .insert(email.clone(), password_hash.to_string());

        Ok(())
    }

    async fn put_session(
        &self,
        token_hash: &str,
        email: &Email,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.retain(|_, entry| entry.is_live());
        inner
            .sessions
            .insert(token_hash.to_string(), Expiring::new(email, ttl));

        Ok(())
    }

    async fn session(&self, token_hash: &str) -> Result<Option<Email>, StoreError> {
        let mut inner = self.inner.lock().await;

        match inner.sessions.get(token_hash) {
            Some(entry) if entry.is_live() => Ok(Some(entry.email.clone())),
            Some(_) => {
                inner.sessions.remove(token_hash);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove_session(&self, token_hash: &str) -> Result<Option<Email>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .sessions
            .remove(token_hash)
            .map(|entry| entry.email))
    }

    async fn put_reset(
        &self,
        code_hash: &str,
        email: &Email,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.resets.retain(|_, entry| entry.is_live());
        inner
            .resets
            .insert(code_hash.to_string(), Expiring::new(email, ttl));

        Ok(())
    }

    async fn take_reset(&self, code_hash: &str) -> Result<Option<Email>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .resets
            .remove(code_hash)
            .filter(Expiring::is_live)
            .map(|entry| entry.email))
    }
}

/// Keeps every delivered reset code so callers can read them back.
#[derive(Default)]
pub struct MemoryOutbox {
    sent: Mutex<Vec<(Email, ResetCode)>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_code_for(&self, email: &Email) -> Option<ResetCode> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Outbox for MemoryOutbox {
    async fn deliver_reset(&self, email: &Email, code: &ResetCode) -> Result<(), StoreError> {
        self.sent.lock().await.push((email.clone(), code.clone()));

        Ok(())
    }
}
