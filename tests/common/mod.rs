#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use teamboard::credentials::CredentialStore;
use teamboard::http::{ApiClient, Body, HttpRequest, HttpResponse, Transport};
use teamboard::models::TokenPair;
use teamboard::TransportError;

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Answers requests with a handler and records everything it was sent.
/// Each send yields once so concurrent callers interleave.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(MockTransport {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        tokio::task::yield_now().await;
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

pub fn json(status: u16, body: Value) -> Result<HttpResponse, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.to_string(),
    })
}

pub fn text(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    Ok(HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.to_string(),
    })
}

pub fn no_content() -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: StatusCode::NO_CONTENT,
        headers: HeaderMap::new(),
        body: String::new(),
    })
}

pub fn bearer(request: &HttpRequest) -> Option<String> {
    request
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

pub fn json_body(request: &HttpRequest) -> Value {
    match &request.body {
        Some(Body::Json(text)) => serde_json::from_str(text).unwrap(),
        _ => Value::Null,
    }
}

pub fn client(transport: Arc<MockTransport>, access: &str, refresh: &str) -> ApiClient {
    let credentials = CredentialStore::in_memory();
    if !access.is_empty() || !refresh.is_empty() {
        credentials.set(&TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        });
    }
    ApiClient::new("http://backend.test", transport, credentials)
}
