use std::sync::Arc;

use ledger::{
    AccountStore, Ledger, Outbox, RecordStore, SessionStore,
    memory::{MemoryAccountStore, MemoryRecordStore},
};
use tracing::info;

use super::{
    config::{Backend, Config},
    database::{RedisAccountStore, RedisRecordStore, init_redis},
    error::AppError,
    utils::LogOutbox,
};

pub struct AppState {
    pub config: Config,
    pub ledger: Ledger,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let outbox = Arc::new(LogOutbox);

        match config.backend {
            Backend::Redis => {
                let connection = init_redis(&config.redis_url).await?;

                Ok(Self::with_backends(
                    config,
                    Arc::new(RedisRecordStore::new(connection.clone())),
                    Arc::new(RedisAccountStore::new(connection)),
                    outbox,
                ))
            }
            Backend::Memory => {
                info!("Using in-memory store, data is lost on exit");

                Ok(Self::with_backends(
                    config,
                    Arc::new(MemoryRecordStore::new()),
                    Arc::new(MemoryAccountStore::new()),
                    outbox,
                ))
            }
        }
    }

    pub fn with_backends(
        config: Config,
        records: Arc<dyn RecordStore>,
        accounts: Arc<dyn AccountStore>,
        outbox: Arc<dyn Outbox>,
    ) -> Arc<Self> {
        let sessions = SessionStore::new(accounts, outbox)
            .with_session_ttl(config.session_ttl)
            .with_reset_ttl(config.reset_ttl);

        Arc::new(Self {
            config,
            ledger: Ledger::new(records),
            sessions: Arc::new(sessions),
        })
    }
}
