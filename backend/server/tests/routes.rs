//! Router tests over in-memory backends, no network.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use http_body_util::BodyExt;
use async_trait::async_trait;
use ledger::{
    ContactRecord, Email, Namespace, RecordId, RecordStore, StoreError, ValidContact,
    memory::{MemoryAccountStore, MemoryOutbox, MemoryRecordStore},
};
use serde_json::{Value, json};
use server::{
    config::Config,
    router,
    state::AppState,
    user::{ContactsBody, ErrorBody, SessionBody},
};
use tokio::sync::Notify;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    outbox: Arc<MemoryOutbox>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_records(Arc::new(MemoryRecordStore::new()))
    }

    fn with_records(records: Arc<dyn RecordStore>) -> Self {
        let outbox = Arc::new(MemoryOutbox::new());
        let state = AppState::with_backends(
            Config::default(),
            records,
            Arc::new(MemoryAccountStore::new()),
            outbox.clone(),
        );

        Self {
            router: router(state),
            outbox,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Signs up and returns the `session=...` pair for later requests.
    async fn sign_up(&self, email: &str, password: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/signup",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        session_pair(&response)
    }

    async fn add(&self, cookie: &str, name: &str, phone: &str, email: &str) -> Response {
        self.send(
            Method::POST,
            "/contacts",
            Some(cookie),
            Some(json!({ "name": name, "phone": phone, "email": email })),
        )
        .await
    }

    async fn contacts(&self, cookie: &str) -> ContactsBody {
        let response = self.send(Method::GET, "/", Some(cookie), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        read_json(response).await
    }
}

fn session_pair(response: &Response) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_redirects_to_login(response: &Response) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/healthz", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_redirect_without_session() {
    let app = TestApp::new();

    assert_redirects_to_login(&app.send(Method::GET, "/", None, None).await);
    assert_redirects_to_login(
        &app.send(Method::GET, "/", Some("session=not-a-real-token"), None)
            .await,
    );
    assert_redirects_to_login(
        &app.add("session=not-a-real-token", "Bob", "5551234", "bob@x.com")
            .await,
    );
    assert_redirects_to_login(
        &app.send(
            Method::DELETE,
            "/contacts/6c1c4a32-6a7f-4d0b-9a53-8f5a8c1b9e11",
            None,
            None,
        )
        .await,
    );
}

#[tokio::test]
async fn test_full_scenario() {
    let app = TestApp::new();
    app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw1pw1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_pair(&response);
    let session: SessionBody = read_json(response).await;
    assert_eq!(session.email, "a@x.com");

    assert!(app.contacts(&cookie).await.contacts.is_empty());

    let response = app.add(&cookie, "Bob", "555-1234", "bob@x.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let listed: ContactsBody = read_json(response).await;
    assert_eq!(listed.contacts.len(), 1);
    assert_eq!(listed.contacts[0].name, "Bob");
    assert_eq!(listed.contacts[0].phone, "555-1234");
    assert_eq!(listed.contacts[0].email, "bob@x.com");

    let id = listed.contacts[0].id;
    let response = app
        .send(Method::DELETE, &format!("/contacts/{id}"), Some(&cookie), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: ContactsBody = read_json(response).await;
    assert!(listed.contacts.is_empty());

    assert!(app.contacts(&cookie).await.contacts.is_empty());
}

#[tokio::test]
async fn test_wrong_password() {
    let app = TestApp::new();
    app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "nope-nope" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Failed to log in");
}

#[tokio::test]
async fn test_duplicate_signup() {
    let app = TestApp::new();
    app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "A@X.com", "password": "other-pw" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Failed to create an account");
}

#[tokio::test]
async fn test_namespace_isolation() {
    let app = TestApp::new();
    let alice = app.sign_up("a@x.com", "pw1pw1").await;
    let bea = app.sign_up("b@x.com", "pw2pw2").await;

    app.add(&alice, "Bob", "5551234", "bob@x.com").await;
    let response = app.add(&bea, "Eve", "5559876", "eve@x.com").await;
    let beas: ContactsBody = read_json(response).await;
    let eve = beas.contacts[0].id;

    let alices = app.contacts(&alice).await;
    assert_eq!(alices.email, "a@x.com");
    assert_eq!(alices.contacts.len(), 1);
    assert_eq!(alices.contacts[0].name, "Bob");

    // a's session cannot delete b's record
    let response = app
        .send(Method::DELETE, &format!("/contacts/{eve}"), Some(&alice), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Failed to delete contact!");

    assert_eq!(app.contacts(&bea).await.contacts.len(), 1);
}

#[tokio::test]
async fn test_invalid_contact() {
    let app = TestApp::new();
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;

    let response = app.add(&cookie, "Bob", "call me", "bob@x.com").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert!(body.error.starts_with("Failed to save contact! phone"));
    assert!(app.contacts(&cookie).await.contacts.is_empty());
}

#[tokio::test]
async fn test_malformed_payload() {
    let app = TestApp::new();
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(
            Method::POST,
            "/contacts",
            Some(&cookie),
            Some(json!({ "name": "Bob" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Malformed payload");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::new();
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;

    let response = app.send(Method::POST, "/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(
        response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0")
    );

    assert_redirects_to_login(&app.send(Method::GET, "/", Some(&cookie), None).await);
}

#[tokio::test]
async fn test_password_reset() {
    let app = TestApp::new();
    app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(
            Method::POST,
            "/forgot-password",
            None,
            Some(json!({ "email": "a@x.com" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let email = Email::parse("a@x.com").unwrap();
    let code = app.outbox.last_code_for(&email).await.unwrap();

    let response = app
        .send(
            Method::POST,
            "/reset-password",
            None,
            Some(json!({ "code": code.as_str(), "password": "fresh-pw" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let old = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "pw1pw1" })),
        )
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "email": "a@x.com", "password": "fresh-pw" })),
        )
        .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_unknown_email() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/forgot-password",
            None,
            Some(json!({ "email": "nobody@x.com" })),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Failed to reset password");
    assert_eq!(app.outbox.sent_count().await, 0);
}

#[tokio::test]
async fn test_malformed_record_id() {
    let app = TestApp::new();
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;

    let response = app
        .send(Method::DELETE, "/contacts/not-a-uuid", Some(&cookie), None)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = read_json(response).await;
    assert_eq!(body.error, "Malformed payload");
}

#[tokio::test]
async fn test_delete_twice() {
    let app = TestApp::new();
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;
    let listed: ContactsBody = read_json(app.add(&cookie, "Bob", "555-1234", "bob@x.com").await).await;
    let uri = format!("/contacts/{}", listed.contacts[0].id);

    let first = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.send(Method::DELETE, &uri, Some(&cookie), None).await;
    assert_eq!(second.status(), StatusCode::BAD_GATEWAY);
    let body: ErrorBody = read_json(second).await;
    assert_eq!(body.error, "Failed to delete contact!");
}

/// Holds every create until released.
struct HeldCreates {
    inner: MemoryRecordStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl RecordStore for HeldCreates {
    async fn create(
        &self,
        namespace: &Namespace,
        contact: ValidContact,
    ) -> Result<ContactRecord, StoreError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.create(namespace, contact).await
    }

    async fn list(&self, namespace: &Namespace) -> Result<Vec<ContactRecord>, StoreError> {
        self.inner.list(namespace).await
    }

    async fn delete(&self, namespace: &Namespace, id: RecordId) -> Result<(), StoreError> {
        self.inner.delete(namespace, id).await
    }
}

#[tokio::test]
async fn test_overlapping_add_is_conflict() {
    let records = Arc::new(HeldCreates {
        inner: MemoryRecordStore::new(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let app = Arc::new(TestApp::with_records(records.clone()));
    let cookie = app.sign_up("a@x.com", "pw1pw1").await;

    let pending = tokio::spawn({
        let app = app.clone();
        let cookie = cookie.clone();
        async move { app.add(&cookie, "Bob", "555-1234", "bob@x.com").await }
    });
    records.entered.notified().await;

    let response = app.add(&cookie, "Bob", "555-1234", "bob@x.com").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ErrorBody = read_json(response).await;
    assert!(body.error.starts_with("Failed to save contact!"));

    records.release.notify_one();
    assert_eq!(pending.await.unwrap().status(), StatusCode::CREATED);
    assert_eq!(app.contacts(&cookie).await.contacts.len(), 1);
}
