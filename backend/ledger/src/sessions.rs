//! # Session Store
//!
//! Issues and tracks authenticated identities.
//!
//! ## Flow
//!
//! - Register: normalize the email, hash the password (Argon2id), insert the account, sign in
//! - Authenticate: verify the password against the stored hash, issue a fresh token
//! - Resolve: token hash lookup, unknown or expired means no identity
//! - Deauthenticate: drop the token, unknown tokens are fine
//! - Password reset: a single-use code goes to the [`Outbox`], confirming it swaps the hash
//!
//! Every sign in and sign out is broadcast as a [`SessionEvent`].
use std::{sync::Arc, time::Duration};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::{sync::broadcast, task::spawn_blocking};
use tracing::{debug, info};

use crate::{
    error::{AuthError, MIN_PASSWORD_LEN},
    identity::{Email, Identity, ResetCode, SessionToken},
    store::{AccountStore, Outbox},
};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_RESET_TTL: Duration = Duration::from_secs(60 * 60);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Identity),
    SignedOut(Identity),
}

pub struct SessionStore {
    accounts: Arc<dyn AccountStore>,
    outbox: Arc<dyn Outbox>,
    events: broadcast::Sender<SessionEvent>,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl SessionStore {
    pub fn new(accounts: Arc<dyn AccountStore>, outbox: Arc<dyn Outbox>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            accounts,
            outbox,
            events,
            session_ttl: DEFAULT_SESSION_TTL,
            reset_ttl: DEFAULT_RESET_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_reset_ttl(mut self, ttl: Duration) -> Self {
        self.reset_ttl = ttl;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Identity, SessionToken), AuthError> {
        let email = Email::parse(email).ok_or(AuthError::MalformedEmail)?;
        check_password(password)?;

        let hash = hash_password(password).await?;
        if !self.accounts.insert_account(&email, &hash).await? {
            debug!(%email, "Registration rejected, email taken");
            return Err(AuthError::EmailTaken);
        }

        info!(%email, "Account registered");
        self.sign_in(email).await
    }

    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Identity, SessionToken), AuthError> {
        let email = Email::parse(email).ok_or(AuthError::InvalidCredentials)?;

        let Some(stored) = self.accounts.password_hash(&email).await? else {
            debug!(%email, "Authentication for unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, stored).await? {
            debug!(%email, "Authentication with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.sign_in(email).await
    }

    pub async fn resolve(&self, token: &SessionToken) -> Result<Option<Identity>, AuthError> {
        Ok(self
            .accounts
            .session(&token.hash())
            .await?
            .map(Identity::new))
    }

    pub async fn deauthenticate(&self, token: &SessionToken) -> Result<(), AuthError> {
        if let Some(email) = self.accounts.remove_session(&token.hash()).await? {
            let _ = self.events.send(SessionEvent::SignedOut(Identity::new(email)));
        }

        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email).ok_or(AuthError::UnknownResetTarget)?;

        if self.accounts.password_hash(&email).await?.is_none() {
            return Err(AuthError::UnknownResetTarget);
        }

        let code = ResetCode::generate();
        self.accounts
            .put_reset(&code.hash(), &email, self.reset_ttl)
            .await?;
        self.outbox.deliver_reset(&email, &code).await?;

        info!(%email, "Password reset requested");
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        code: &ResetCode,
        password: &str,
    ) -> Result<(), AuthError> {
        check_password(password)?;

        let email = self
            .accounts
            .take_reset(&code.hash())
            .await?
            .ok_or(AuthError::InvalidResetCode)?;

        let hash = hash_password(password).await?;
        self.accounts.set_password_hash(&email, &hash).await?;

        info!(%email, "Password reset completed");
        Ok(())
    }

    async fn sign_in(&self, email: Email) -> Result<(Identity, SessionToken), AuthError> {
        let token = SessionToken::generate();
        self.accounts
            .put_session(&token.hash(), &email, self.session_ttl)
            .await?;

        let identity = Identity::new(email);
        let _ = self.events.send(SessionEvent::SignedIn(identity.clone()));

        Ok((identity, token))
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }

    Ok(())
}

/// Argon2 is CPU bound, so both directions run off the async workers.
async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();

    spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hash(format!("hashing task failed: {e}")))?
}

async fn verify_password(password: &str, stored: String) -> Result<bool, AuthError> {
    let password = password.to_owned();

    spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored).map_err(|e| AuthError::Hash(e.to_string()))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hash(format!("verification task failed: {e}")))?
}
