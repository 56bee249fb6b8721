//! # Redis
//!
//! Document store for contacts, accounts and sessions.
//!
//! ## Layout
//!
//! - `contacts:{email}` hash: record id to JSON record
//! - `contacts:{email}:order` list: record ids in insertion order, defines list order
//! - `accounts` hash: email to Argon2 PHC string
//! - `session:{sha256(token)}` string: email, expires with the session
//! - `reset:{sha256(code)}` string: email, expires with the reset code
//!
//! ## Implementation
//!
//! - The namespace of a user is the pair of `contacts:{email}` keys, nothing else reads them
//! - Record writes touch the hash and the order list in one `MULTI`/`EXEC` pipeline
//! - Reset codes are read with `GETDEL`, so a code works once
//! - Secrets never hit Redis in the clear, only their hashes
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ledger::{
    AccountStore, ContactRecord, Email, Namespace, RecordId, RecordStore, StoreError, ValidContact,
};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;
use uuid::Uuid;

const ACCOUNTS_KEY: &str = "accounts";

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    info!("Connected to Redis");
    Ok(connection_manager)
}

fn records_key(namespace: &Namespace) -> String {
    format!("contacts:{namespace}")
}

fn order_key(namespace: &Namespace) -> String {
    format!("contacts:{namespace}:order")
}

fn session_key(token_hash: &str) -> String {
    format!("session:{token_hash}")
}

fn reset_key(code_hash: &str) -> String {
    format!("reset:{code_hash}")
}

/// `SET EX` rejects a zero expiry.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn stored_email(raw: String) -> Result<Email, StoreError> {
    Email::parse(&raw).ok_or_else(|| StoreError::Corrupt(format!("stored email {raw:?}")))
}

#[derive(Clone)]
pub struct RedisRecordStore {
    connection: ConnectionManager,
}

impl RedisRecordStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl RecordStore for RedisRecordStore {
    async fn create(
        &self,
        namespace: &Namespace,
        contact: ValidContact,
    ) -> Result<ContactRecord, StoreError> {
        let record = contact.into_record(Uuid::new_v4(), Utc::now());
        let id = record.id.to_string();
        let json = serde_json::to_string(&record).map_err(StoreError::backend)?;

        let mut connection = self.connection.clone();
        redis::pipe()
            .atomic()
            .hset(records_key(namespace), &id, json)
            .ignore()
            .rpush(order_key(namespace), &id)
            .ignore()
            .query_async::<()>(&mut connection)
            .await
            .map_err(StoreError::backend)?;

        Ok(record)
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<ContactRecord>, StoreError> {
        let mut connection = self.connection.clone();

        let ids: Vec<String> = connection
            .lrange(order_key(namespace), 0, -1)
            .await
            .map_err(StoreError::backend)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(records_key(namespace))
            .arg(&ids)
            .query_async(&mut connection)
            .await
            .map_err(StoreError::backend)?;

        // an id without an entry was deleted between the two reads
        entries
            .into_iter()
            .flatten()
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| StoreError::Corrupt(e.to_string()))
            })
            .collect()
    }

    async fn delete(&self, namespace: &Namespace, id: RecordId) -> Result<(), StoreError> {
        let field = id.to_string();
        let mut connection = self.connection.clone();

        let (removed, _): (i64, i64) = redis::pipe()
            .atomic()
            .hdel(records_key(namespace), &field)
            .lrem(order_key(namespace), 1, &field)
            .query_async(&mut connection)
            .await
            .map_err(StoreError::backend)?;

        if removed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(())
    }
}

#[derive(Clone)]
pub struct RedisAccountStore {
    connection: ConnectionManager,
}

impl RedisAccountStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl AccountStore for RedisAccountStore {
    async fn insert_account(&self, email: &Email, password_hash: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();

        connection
            .hset_nx(ACCOUNTS_KEY, email.as_str(), password_hash)
            .await
            .map_err(StoreError::backend)
    }

    async fn password_hash(&self, email: &Email) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        connection
            .hget(ACCOUNTS_KEY, email.as_str())
            .await
            .map_err(StoreError::backend)
    }

    async fn set_password_hash(&self, email: &Email, password_hash: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        connection
            .hset::<_, _, _, ()>(ACCOUNTS_KEY, email.as_str(), password_hash)
            .await
            .map_err(StoreError::backend)
    }

    async fn put_session(
        &self,
        token_hash: &str,
        email: &Email,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        connection
            .set_ex::<_, _, ()>(session_key(token_hash), email.as_str(), ttl_secs(ttl))
            .await
            .map_err(StoreError::backend)
    }

    async fn session(&self, token_hash: &str) -> Result<Option<Email>, StoreError> {
        let mut connection = self.connection.clone();

        let email: Option<String> = connection
            .get(session_key(token_hash))
            .await
            .map_err(StoreError::backend)?;

        email.map(stored_email).transpose()
    }

    async fn remove_session(&self, token_hash: &str) -> Result<Option<Email>, StoreError> {
        let mut connection = self.connection.clone();

        let email: Option<String> = connection
            .get_del(session_key(token_hash))
            .await
            .map_err(StoreError::backend)?;

        email.map(stored_email).transpose()
    }

    async fn put_reset(
        &self,
        code_hash: &str,
        email: &Email,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        connection
            .set_ex::<_, _, ()>(reset_key(code_hash), email.as_str(), ttl_secs(ttl))
            .await
            .map_err(StoreError::backend)
    }

    async fn take_reset(&self, code_hash: &str) -> Result<Option<Email>, StoreError> {
        let mut connection = self.connection.clone();

        let email: Option<String> = connection
            .get_del(reset_key(code_hash))
            .await
            .map_err(StoreError::backend)?;

        email.map(stored_email).transpose()
    }
}
