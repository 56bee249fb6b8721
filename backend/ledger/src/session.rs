//! # Session
//!
//! One client's view of the session store: the token it holds and the identity
//! that token is bound to. Components get the session passed in rather than
//! reaching for shared global state.
//!
//! The bound identity is published through a watch channel, so any number of
//! observers see the current identity (or its absence) and every change after it.
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::warn;

use crate::{
    error::LedgerError,
    gate::{Admission, admit},
    identity::{Identity, SessionToken},
    sessions::SessionStore,
};

pub struct Session {
    store: Arc<SessionStore>,
    token: Mutex<Option<SessionToken>>,
    identity: watch::Sender<Option<Identity>>,
}

impl Session {
    pub fn new(store: Arc<SessionStore>) -> Self {
        let (identity, _) = watch::channel(None);

        Self {
            store,
            token: Mutex::new(None),
            identity,
        }
    }

    pub fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }

    /// Access gate over the currently bound identity.
    pub fn admission(&self) -> Admission {
        admit(self.current())
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, LedgerError> {
        let (identity, token) = self.store.register(email, password).await?;
        self.bind(identity.clone(), token).await;

        Ok(identity)
    }

    pub async fn log_in(&self, email: &str, password: &str) -> Result<Identity, LedgerError> {
        let (identity, token) = self.store.authenticate(email, password).await?;
        self.bind(identity.clone(), token).await;

        Ok(identity)
    }

    pub async fn log_out(&self) -> Result<(), LedgerError> {
        let Some(token) = self.take_token() else {
            return Ok(());
        };
        self.identity.send_replace(None);

        self.store.deauthenticate(&token).await?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), LedgerError> {
        self.store.request_password_reset(email).await?;
        Ok(())
    }

    /// Re-resolves the held token so an expiry on the store side unbinds here too.
    pub async fn refresh(&self) -> Result<Option<Identity>, LedgerError> {
        let Some(token) = self.token() else {
            return Ok(None);
        };

        let resolved = self.store.resolve(&token).await?;

        let mut held = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if held.as_ref() != Some(&token) {
            // rebound or logged out while resolving, that binding wins
            return Ok(self.current());
        }
        if resolved.is_none() {
            held.take();
        }
        self.identity.send_if_modified(|current| {
            if *current == resolved {
                return false;
            }
            *current = resolved.clone();
            true
        });

        Ok(resolved)
    }

    async fn bind(&self, identity: Identity, token: SessionToken) {
        let previous = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token);

        self.identity.send_replace(Some(identity));

        if let Some(previous) = previous {
            if let Err(e) = self.store.deauthenticate(&previous).await {
                warn!("Failed to drop replaced session: {e}");
            }
        }
    }

    fn token(&self) -> Option<SessionToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_token(&self) -> Option<SessionToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
