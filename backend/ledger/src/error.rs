use thiserror::Error;

use crate::contact::{Field, RecordId};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Coarse failure kinds surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthFailure,
    StoreOperationFailure,
    InvalidContact,
    Busy,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record {0} not found")]
    NotFound(RecordId),

    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    #[error("Backend error: {0}")]
    Backend(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(error))
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Malformed email")]
    MalformedEmail,

    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("No account for reset target")]
    UnknownResetTarget,

    #[error("Reset code invalid or expired")]
    InvalidResetCode,

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("{field} {reason}")]
    InvalidContact { field: Field, reason: &'static str },

    #[error("Another operation is still in flight")]
    Busy,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Auth(AuthError::Store(_)) => ErrorKind::StoreOperationFailure,
            LedgerError::Auth(_) => ErrorKind::AuthFailure,
            LedgerError::Store(_) => ErrorKind::StoreOperationFailure,
            LedgerError::InvalidContact { .. } => ErrorKind::InvalidContact,
            LedgerError::Busy => ErrorKind::Busy,
        }
    }
}
