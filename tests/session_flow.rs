mod common;

use std::sync::Arc;

use common::{bearer, client, json, json_body, MockTransport};
use serde_json::json;
use teamboard::models::{LoginPayload, RegisterPayload};
use teamboard::state::{display_name, SessionState};

fn alice() -> LoginPayload {
    LoginPayload {
        username: "alice".into(),
        password: "pw".into(),
    }
}

#[tokio::test]
async fn test_login_then_profile() {
    let transport = MockTransport::new(|req| match req.url.path() {
        "/api/auth/login/" => json(200, json!({ "success": true, "data": { "access": "a1", "refresh": "r1" } })),
        "/api/auth/me/" => json(200, json!({ "username": "alice", "id": 7 })),
        _ => json(404, json!({})),
    });
    let mut session = SessionState::new(Arc::new(client(transport.clone(), "", "")));

    assert!(session.login(&alice()).await);

    assert!(session.is_authenticated());
    assert!(!session.loading);
    assert_eq!(session.error, None);
    assert_eq!(session.client().credentials().get().access, "a1");
    assert_eq!(session.client().credentials().username(), "alice");
    assert_eq!(session.user.as_ref().map(|u| u.id), Some(7));
    assert_eq!(display_name(&session), "alice");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(bearer(&requests[0]), None);
    assert_eq!(json_body(&requests[0]), json!({ "username": "alice", "password": "pw" }));
    assert_eq!(bearer(&requests[1]).as_deref(), Some("Bearer a1"));
}

#[tokio::test]
async fn test_login_survives_profile_failure() {
    let transport = MockTransport::new(|req| match req.url.path() {
        "/api/auth/login/" => json(200, json!({ "access": "a1", "refresh": "r1" })),
        _ => json(500, json!({ "message": "boom" })),
    });
    let mut session = SessionState::new(Arc::new(client(transport, "", "")));

    assert!(session.login(&alice()).await);
    assert!(session.is_authenticated());
    assert!(session.user.is_none());
    assert_eq!(session.error, None);
}

#[tokio::test]
async fn test_login_failure_records_message() {
    let transport = MockTransport::new(|_| {
        json(401, json!({ "success": false, "message": "Invalid credentials" }))
    });
    let mut session = SessionState::new(Arc::new(client(transport.clone(), "", "")));

    assert!(!session.login(&alice()).await);
    assert!(!session.is_authenticated());
    assert!(!session.loading);
    assert_eq!(session.error.as_deref(), Some("Invalid credentials"));
    assert!(transport.requests_to("/api/auth/refresh/").is_empty());
}

#[tokio::test]
async fn test_profile_with_wrong_shape_is_rejected() {
    let transport = MockTransport::new(|_| json(200, json!({ "detail": "not a user" })));
    let mut session = SessionState::new(Arc::new(client(transport, "a1", "r1")));

    assert!(session.is_authenticated());
    assert!(!session.load_me().await);
    assert!(session.user.is_none());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_profile_load_after_cleared_session() {
    let transport = MockTransport::new(|_| json(401, json!({})));
    let mut session = SessionState::new(Arc::new(client(transport, "a1", "r1")));
    session.username = "alice".into();

    assert!(!session.load_me().await);
    assert!(!session.is_authenticated());
    assert_eq!(session.username, "");
}

#[tokio::test]
async fn test_register_logs_in_with_same_credentials() {
    let transport = MockTransport::new(|req| match req.url.path() {
        "/api/auth/register/" => json(201, json!({ "success": true, "data": { "id": 9, "username": "bob" } })),
        "/api/auth/login/" => json(200, json!({ "access": "a9", "refresh": "r9" })),
        "/api/auth/me/" => json(
            200,
            json!({ "id": 9, "username": "bob", "first_name": "Bob", "last_name": "Stone" }),
        ),
        _ => json(404, json!({})),
    });
    let mut session = SessionState::new(Arc::new(client(transport.clone(), "", "")));

    let payload = RegisterPayload {
        username: "bob".into(),
        email: "bob@example.com".into(),
        password: "secret".into(),
        first_name: "Bob".into(),
        last_name: "Stone".into(),
    };
    assert!(session.register(&payload).await);
    assert_eq!(session.access, "a9");
    assert_eq!(display_name(&session), "Bob Stone");

    let login = transport.requests_to("/api/auth/login/");
    assert_eq!(login.len(), 1);
    assert_eq!(json_body(&login[0]), json!({ "username": "bob", "password": "secret" }));
}

#[tokio::test]
async fn test_register_failure_skips_login() {
    let transport = MockTransport::new(|_| {
        json(400, json!({ "success": false, "errors": { "detail": "username taken" } }))
    });
    let mut session = SessionState::new(Arc::new(client(transport.clone(), "", "")));

    let payload = RegisterPayload {
        username: "bob".into(),
        email: "bob@example.com".into(),
        password: "secret".into(),
        first_name: String::new(),
        last_name: String::new(),
    };
    assert!(!session.register(&payload).await);
    assert_eq!(session.error.as_deref(), Some("username taken"));
    assert!(!session.loading);
    assert!(transport.requests_to("/api/auth/login/").is_empty());
}

#[tokio::test]
async fn test_logout_makes_no_request() {
    let transport = MockTransport::new(|_| json(500, json!({})));
    let mut session = SessionState::new(Arc::new(client(transport.clone(), "a1", "r1")));
    session.error = Some("stale".into());

    session.logout();

    assert!(!session.is_authenticated());
    assert_eq!(session.error, None);
    assert!(session.client().credentials().get().is_empty());
    assert!(transport.requests().is_empty());
}
