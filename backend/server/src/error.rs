use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ledger::{ErrorKind, LedgerError};
use thiserror::Error;
use tracing::{error, warn};

use crate::{config::ConfigError, user::ErrorBody};

/// What the caller was trying to do, used for the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SignUp,
    LogIn,
    LogOut,
    ResetPassword,
    LoadContacts,
    SaveContact,
    DeleteContact,
}

impl Action {
    pub fn message(&self) -> &'static str {
        match self {
            Action::SignUp => "Failed to create an account",
            Action::LogIn => "Failed to log in",
            Action::LogOut => "Failed to log out",
            Action::ResetPassword => "Failed to reset password",
            Action::LoadContacts => "Failed to load contacts",
            Action::SaveContact => "Failed to save contact!",
            Action::DeleteContact => "Failed to delete contact!",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("{}", .action.message())]
    Failed {
        action: Action,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn failed(action: Action) -> impl FnOnce(LedgerError) -> AppError {
        move |source| AppError::Failed { action, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::Failed { source, .. } => match source.kind() {
                ErrorKind::AuthFailure => StatusCode::UNAUTHORIZED,
                ErrorKind::StoreOperationFailure => StatusCode::BAD_GATEWAY,
                ErrorKind::InvalidContact => StatusCode::BAD_REQUEST,
                ErrorKind::Busy => StatusCode::CONFLICT,
            },
            AppError::Config(_) | AppError::Redis(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text shown to the user. Backend detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::Failed { action, source } => match source.kind() {
                ErrorKind::InvalidContact | ErrorKind::Busy => {
                    format!("{} {source}", action.message())
                }
                ErrorKind::AuthFailure | ErrorKind::StoreOperationFailure => {
                    action.message().to_string()
                }
            },
            AppError::MalformedPayload => self.to_string(),
            AppError::Config(_) | AppError::Redis(_) | AppError::InternalError(_) => {
                "Internal error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Failed { action, source } => {
                warn!(?action, kind = ?source.kind(), "{source}");
            }
            AppError::Config(_) | AppError::Redis(_) | AppError::InternalError(_) => {
                error!("{self}");
            }
            AppError::MalformedPayload => {}
        }

        let body = ErrorBody {
            error: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::{AuthError, Field, StoreError};
    use uuid::Uuid;

    fn failed(action: Action, source: LedgerError) -> AppError {
        AppError::failed(action)(source)
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::MalformedPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            failed(Action::LogIn, AuthError::InvalidCredentials.into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            failed(
                Action::DeleteContact,
                StoreError::NotFound(Uuid::new_v4()).into()
            )
            .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failed(Action::SaveContact, LedgerError::Busy).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            failed(Action::SaveContact, StoreError::Corrupt("boom".into()).into())
                .public_message(),
            "Failed to save contact!"
        );
        assert_eq!(
            failed(
                Action::SaveContact,
                LedgerError::InvalidContact {
                    field: Field::Name,
                    reason: "is required"
                }
            )
            .public_message(),
            "Failed to save contact! name is required"
        );
        assert_eq!(
            failed(Action::LogIn, AuthError::InvalidCredentials.into()).public_message(),
            "Failed to log in"
        );
    }

    #[test]
    fn test_backend_detail_hidden() {
        let error = failed(
            Action::LoadContacts,
            StoreError::Corrupt("secret detail".into()).into(),
        );

        assert!(!error.public_message().contains("secret detail"));
    }
}
