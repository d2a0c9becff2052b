//! Authenticated JSON client for the TeamBoard REST API.
//!
//! Every request goes through [`ApiClient::request`], which attaches the
//! stored bearer token, transparently refreshes an expired access token on
//! a 401 and retries the original request once, normalizes error bodies into
//! [`ApiError`], and unwraps the backend's `{"data": ...}` envelope.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::credentials::CredentialStore;
use crate::error::{ApiError, TransportError};
use crate::models::TokenPair;

pub const REFRESH_PATH: &str = "/api/auth/refresh/";

const JSON: &str = "application/json";

#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Serialized JSON text.
    Json(String),
    /// Opaque bytes, sent without a default content type.
    Raw(Vec<u8>),
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Body>,
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains(JSON))
            .unwrap_or(false)
    }
}

/// Sends one request and hands back whatever the server answered.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        builder = match request.body {
            Some(Body::Json(text)) => builder.body(text),
            Some(Body::Raw(bytes)) => builder.body(bytes),
            None => builder,
        };

        let res = builder.send().await?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Per-call knobs for [`ApiClient::request`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub query: Vec<(String, String)>,
    /// Attach the stored access token. Only authenticated calls take part
    /// in the refresh-and-retry protocol.
    pub auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            query: Vec::new(),
            auth: true,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        RequestOptions {
            method: Method::DELETE,
            ..Self::default()
        }
    }

    pub fn post<B: Serialize + ?Sized>(payload: &B) -> Result<Self, ApiError> {
        Self::with_json(Method::POST, payload)
    }

    pub fn patch<B: Serialize + ?Sized>(payload: &B) -> Result<Self, ApiError> {
        Self::with_json(Method::PATCH, payload)
    }

    fn with_json<B: Serialize + ?Sized>(method: Method, payload: &B) -> Result<Self, ApiError> {
        Ok(RequestOptions {
            method,
            body: Some(Body::Json(serde_json::to_string(payload)?)),
            ..Self::default()
        })
    }

    pub fn without_auth(mut self) -> Self {
        self.auth = false;
        self
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    credentials: CredentialStore,
    // Held for the whole refresh exchange so concurrent 401s share one refresh.
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        credentials: CredentialStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            base_url,
            transport,
            credentials,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_reqwest(base_url: impl Into<String>, credentials: CredentialStore) -> Self {
        Self::new(base_url, Arc::new(ReqwestTransport::new()), credentials)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Performs a request and deserializes the (unwrapped) payload.
    ///
    /// Empty results (204 or a non-JSON body) deserialize from `null`, so
    /// `T` should be `()` or an `Option` for endpoints that answer that way.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let value = self.request_value(path, options).await?;
        Ok(serde_json::from_value(value.unwrap_or(Value::Null))?)
    }

    /// Performs a request and returns the unwrapped JSON payload, or `None`
    /// when the response carried no JSON body.
    pub async fn request_value(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.url(path, &options.query)?;
        let access = if options.auth {
            self.credentials.get().access
        } else {
            String::new()
        };

        let mut response = self.send(&options, &url, &access).await?;

        if response.status == StatusCode::UNAUTHORIZED
            && options.auth
            && self.refresh_access_token(&access).await
        {
            let renewed = self.credentials.get().access;
            response = self.send(&options, &url, &renewed).await?;
        }

        if !response.status.is_success() {
            let message = extract_error_message(&response.body);
            tracing::debug!(
                path,
                status = response.status.as_u16(),
                message = %message,
                "Request failed"
            );
            return Err(ApiError::status(response.status.as_u16(), message));
        }

        decode_success(&response)
    }

    async fn send(
        &self,
        options: &RequestOptions,
        url: &Url,
        access: &str,
    ) -> Result<HttpResponse, ApiError> {
        let headers = build_headers(options, access);
        tracing::debug!(method = %options.method, url = %url, "Sending request");

        let response = self
            .transport
            .send(HttpRequest {
                method: options.method.clone(),
                url: url.clone(),
                headers,
                body: options.body.clone(),
            })
            .await?;

        tracing::debug!(url = %url, status = response.status.as_u16(), "Received response");
        Ok(response)
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// `stale_access` is the token the failing request was sent with. If
    /// the store already holds a different token, another caller refreshed
    /// while this one waited on the lock and no new exchange is made. On
    /// failure every stored credential is cleared before the lock is
    /// released.
    async fn refresh_access_token(&self, stale_access: &str) -> bool {
        let _guard = self.refresh_lock.lock().await;

        let current = self.credentials.get();
        if !current.access.is_empty() && current.access != stale_access {
            tracing::info!("Access token already renewed by a concurrent request");
            return true;
        }
        if current.refresh.is_empty() {
            tracing::warn!("Access token rejected and no refresh token stored, clearing session");
            self.credentials.clear();
            return false;
        }

        tracing::info!("Access token rejected, refreshing");
        match self.exchange_refresh_token(&current.refresh).await {
            Ok(refreshed) => {
                match refreshed.refresh.filter(|r| !r.is_empty()) {
                    Some(rotated) => self.credentials.set(&TokenPair {
                        access: refreshed.access,
                        refresh: rotated,
                    }),
                    None => self.credentials.set_access(&refreshed.access),
                }
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, clearing session");
                self.credentials.clear();
                false
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh: &str) -> Result<RefreshResponse, ApiError> {
        let options = RequestOptions::post(&json!({ "refresh": refresh }))?.without_auth();
        let url = self.url(REFRESH_PATH, &[])?;
        let response = self.send(&options, &url, "").await?;

        if !response.status.is_success() {
            return Err(ApiError::status(
                response.status.as_u16(),
                extract_error_message(&response.body),
            ));
        }

        let value = decode_success(&response)?.unwrap_or(Value::Null);
        let refreshed: RefreshResponse = serde_json::from_value(value)?;
        if refreshed.access.is_empty() {
            return Err(ApiError::status(response.status.as_u16(), "empty access token"));
        }
        Ok(refreshed)
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| ApiError::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

fn build_headers(options: &RequestOptions, access: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));
    for (name, value) in options.headers.iter() {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(Body::Json(_)) = options.body {
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        }
    }

    if options.auth && !access.is_empty() {
        match HeaderValue::from_str(&format!("Bearer {}", access)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!("Stored access token is not a valid header value"),
        }
    }

    headers
}

fn decode_success(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if response.status == StatusCode::NO_CONTENT
        || !response.is_json()
        || response.body.trim().is_empty()
    {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(&response.body)?;
    Ok(Some(unwrap_envelope(value)))
}

/// Returns the `data` field of an enveloped payload, or the value itself.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `message`, then `errors.detail`, then `detail`. A JSON body
/// without any of them yields an empty string so the caller can fall back
/// to a status-coded message; a body that is not JSON is returned as-is.
pub fn extract_error_message(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(_) => return raw.to_string(),
    };

    let candidates = [
        parsed.get("message"),
        parsed.get("errors").and_then(|errors| errors.get("detail")),
        parsed.get("detail"),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(text) = candidate.as_str() {
            return text.to_string();
        }
    }

    match parsed {
        Value::String(text) => text,
        _ => String::new(),
    }
}
