//! Documentation of a personal contacts manager.
//!
//! Users sign up, log in, and keep a private list of contacts (name, phone, email).
//!
//!
//!
//! # General Infrastructure
//! - Browser talks JSON to this server, see [`user`] for the payloads
//! - Server keeps accounts, sessions and contacts in Redis, see [`database`]
//! - One Redis instance, reachable only from the server container
//! - `STORE_BACKEND=memory` runs without Redis, everything is lost on exit
//!
//!
//!
//! # Sessions
//!
//! **Goal**: Only the owner of a contact list can ever read or change it.
//!
//! - Sign up or log in hands out a random token in an `HttpOnly` cookie
//! - Redis only stores the SHA-256 of that token, with the session lifetime as expiry
//! - Every protected request resolves the cookie again, no caching in between
//! - No cookie, unknown token or expired token means a redirect to `/login`
//! - The resolved email is the only key used to reach contacts, so there is no way to
//!   name somebody else's list
//!
//!
//!
//! # Contacts
//!
//! - Add and delete always answer with a fresh read of the list
//! - We never patch a list locally, the store's order is the order shown
//! - A second add/delete for the same user while one is still running gets a 409
//! - Store failures come back as one "Failed to ..." line, details only go to the logs
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Gate |
//! |---|---|---|
//! | GET | `/healthz` | no |
//! | POST | `/signup`, `/login`, `/logout` | no |
//! | POST | `/forgot-password`, `/reset-password` | no |
//! | GET | `/` | yes |
//! | POST | `/contacts` | yes |
//! | DELETE | `/contacts/{id}` | yes |
//!
//!
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=info cargo run
//! ```
//!
//! Run without Redis.
//! ```sh
//! STORE_BACKEND=memory RUST_LOG=debug cargo run
//! ```
//!
//! Smoke test a running server.
//! ```sh
//! cargo run -p tester -- remote --url http://127.0.0.1:1111
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{delete, get, post},
};

use ledger::SessionEvent;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal::ctrl_c, sync::broadcast::error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod user;
pub mod utils;

use config::Config;
use error::AppError;
use routes::{
    add_contact_handler, contacts_handler, delete_contact_handler, forgot_password_handler,
    health_handler, login_handler, logout_handler, reset_password_handler, signup_handler,
};
use state::AppState;

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load().inspect_err(|e| error!("Config rejected: {e}"))?;

    info!("Initializing state...");
    let state = AppState::new(config)
        .await
        .inspect_err(|e| error!("Failed to initialize state: {e}"))?;

    spawn_session_logger(&state);

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;

    info!("Server shutting down...");
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(state.config.cors_origin.clone())
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/healthz", get(health_handler))
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/forgot-password", post(forgot_password_handler))
        .route("/reset-password", post(reset_password_handler))
        .route("/", get(contacts_handler))
        .route("/contacts", post(add_contact_handler))
        .route("/contacts/{id}", delete(delete_contact_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_session_logger(state: &AppState) {
    let mut events = state.sessions.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::SignedIn(identity)) => {
                    info!(email = %identity.email(), "Signed in");
                }
                Ok(SessionEvent::SignedOut(identity)) => {
                    info!(email = %identity.email(), "Signed out");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session log skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            return std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
