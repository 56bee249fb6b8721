use std::sync::Arc;

use axum::{
    Json,
    extract::{
        FromRequestParts, Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use ledger::{Admission, Identity, NewContact, RecordId, ResetCode, admit};
use tracing::{info, warn};

use crate::{
    error::{Action, AppError},
    state::AppState,
    user::{ContactsBody, Credentials, ResetConfirm, ResetRequest, SessionBody},
    utils::{expired_session_cookie, session_cookie, session_token},
};

/// A request that passed the access gate.
pub struct Authenticated(pub Identity);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = match session_token(&parts.headers) {
            Some(token) => state.sessions.resolve(&token).await.unwrap_or_else(|e| {
                warn!("Session lookup failed, treating as signed out: {e}");
                None
            }),
            None => None,
        };

        match admit(identity) {
            Admission::Admit(identity) => Ok(Authenticated(identity)),
            Admission::Redirect(path) => Err(Redirect::to(path).into_response()),
        }
    }
}

fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(inner)| inner).map_err(|e| {
        warn!("Rejected payload: {e}");
        AppError::MalformedPayload
    })
}

fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    param.map(|Path(inner)| inner).map_err(|e| {
        warn!("Rejected path: {e}");
        AppError::MalformedPayload
    })
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let credentials = payload(body)?;

    let (identity, token) = state
        .sessions
        .register(&credentials.email, &credentials.password)
        .await
        .map_err(|e| AppError::failed(Action::SignUp)(e.into()))?;

    let cookie = session_cookie(&token, state.config.session_ttl, state.config.cookie_secure);
    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(SessionBody::from(&identity)),
    )
        .into_response())
}

pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, AppError> {
    let credentials = payload(body)?;

    let (identity, token) = state
        .sessions
        .authenticate(&credentials.email, &credentials.password)
        .await
        .map_err(|e| AppError::failed(Action::LogIn)(e.into()))?;

    let cookie = session_cookie(&token, state.config.session_ttl, state.config.cookie_secure);
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(SessionBody::from(&identity)),
    )
        .into_response())
}

pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state
            .sessions
            .deauthenticate(&token)
            .await
            .map_err(|e| AppError::failed(Action::LogOut)(e.into()))?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, expired_session_cookie(state.config.cookie_secure))],
    )
        .into_response())
}

pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let request = payload(body)?;

    state
        .sessions
        .request_password_reset(&request.email)
        .await
        .map_err(|e| AppError::failed(Action::ResetPassword)(e.into()))?;

    Ok(StatusCode::ACCEPTED)
}

pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ResetConfirm>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let confirm = payload(body)?;

    state
        .sessions
        .confirm_password_reset(&ResetCode::from_raw(&confirm.code), &confirm.password)
        .await
        .map_err(|e| AppError::failed(Action::ResetPassword)(e.into()))?;

    info!("Password reset confirmed");
    Ok(StatusCode::NO_CONTENT)
}

async fn contacts_body(state: &AppState, identity: &Identity) -> Result<ContactsBody, AppError> {
    let contacts = state
        .ledger
        .load(identity)
        .await
        .map_err(AppError::failed(Action::LoadContacts))?;

    Ok(ContactsBody {
        email: identity.email().to_string(),
        contacts,
    })
}

pub async fn contacts_handler(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
) -> Result<Json<ContactsBody>, AppError> {
    Ok(Json(contacts_body(&state, &identity).await?))
}

pub async fn add_contact_handler(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    body: Result<Json<NewContact>, JsonRejection>,
) -> Result<(StatusCode, Json<ContactsBody>), AppError> {
    let contact = payload(body)?;

    state
        .ledger
        .add(&identity, &contact)
        .await
        .map_err(AppError::failed(Action::SaveContact))?;

    Ok((
        StatusCode::CREATED,
        Json(contacts_body(&state, &identity).await?),
    ))
}

pub async fn delete_contact_handler(
    State(state): State<Arc<AppState>>,
    Authenticated(identity): Authenticated,
    id: Result<Path<RecordId>, PathRejection>,
) -> Result<Json<ContactsBody>, AppError> {
    let id = path_param(id)?;

    state
        .ledger
        .delete(&identity, id)
        .await
        .map_err(AppError::failed(Action::DeleteContact))?;

    Ok(Json(contacts_body(&state, &identity).await?))
}
