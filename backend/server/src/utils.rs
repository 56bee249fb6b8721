use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
use ledger::{Email, Outbox, ResetCode, SessionToken, StoreError};
use tracing::info;

pub const SESSION_COOKIE: &str = "session";

pub fn session_cookie(token: &SessionToken, ttl: Duration, secure: bool) -> HeaderValue {
    cookie_header(token.as_str(), ttl.as_secs(), secure)
}

pub fn expired_session_cookie(secure: bool) -> HeaderValue {
    cookie_header("", 0, secure)
}

fn cookie_header(value: &str, max_age: u64, secure: bool) -> HeaderValue {
    let mut cookie =
        format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }

    // tokens are hex, so the header is always visible ASCII
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Finds the session token among all `Cookie` headers of a request.
pub fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionToken::from_raw(value))
}

/// Reset codes land in the log. Swap for a mailer in deployments with one.
pub struct LogOutbox;

#[async_trait]
impl Outbox for LogOutbox {
    async fn deliver_reset(&self, email: &Email, code: &ResetCode) -> Result<(), StoreError> {
        info!(%email, code = code.as_str(), "Password reset code issued");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie() {
        let token = SessionToken::from_raw("abc123");

        let cookie = session_cookie(&token, Duration::from_secs(60), false);
        assert_eq!(
            cookie.to_str().unwrap(),
            "session=abc123; HttpOnly; SameSite=Lax; Path=/; Max-Age=60"
        );

        let secure = session_cookie(&token, Duration::from_secs(60), true);
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_expired_cookie() {
        assert!(
            expired_session_cookie(false)
                .to_str()
                .unwrap()
                .starts_with("session=; ")
        );
    }

    #[test]
    fn test_token_from_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("lang=en; session=feed42 ; x=1"));

        assert_eq!(
            session_token(&headers),
            Some(SessionToken::from_raw("feed42"))
        );
    }

    #[test]
    fn test_missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }
}
