//! Shared HTTP transport.
//!
//! `HttpProvider` wraps a `reqwest::Client` with pre-built headers, the
//! provider's base endpoint and the optional per-request timeout. It maps
//! HTTP failures into the [`rcore::Error`] taxonomy; it never retries.

use rcore::{Error, ProviderId, Result, Secret};
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

/// HTTP transport for one adapter.
#[derive(Clone)]
pub struct HttpProvider {
    provider: ProviderId,
    client: Client,
    headers: HeaderMap,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpProvider {
    /// A transport with Bearer token authentication.
    pub fn bearer(
        provider: ProviderId,
        client: Client,
        key: &Secret,
        endpoint: &str,
    ) -> Result<Self> {
        let value = sensitive(provider, &format!("Bearer {}", key.expose()))?;
        let mut http = Self::no_auth(provider, client, endpoint);
        http.headers.insert(header::AUTHORIZATION, value);
        Ok(http)
    }

    /// A transport without authentication (local servers).
    pub fn no_auth(provider: ProviderId, client: Client, endpoint: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            provider,
            client,
            headers,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            timeout: None,
        }
    }

    /// A transport authenticating with a custom header (`x-api-key`,
    /// `api-key`, `x-goog-api-key`).
    pub fn custom_header(
        provider: ProviderId,
        client: Client,
        name: &'static str,
        key: &Secret,
        endpoint: &str,
    ) -> Result<Self> {
        let value = sensitive(provider, key.expose())?;
        let mut http = Self::no_auth(provider, client, endpoint);
        http.headers.insert(HeaderName::from_static(name), value);
        Ok(http)
    }

    /// Add a static, non-secret header such as an API version.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        self
    }

    /// Set the per-request timeout in seconds.
    pub fn with_timeout(mut self, secs: Option<u64>) -> Self {
        self.timeout = secs.map(Duration::from_secs);
        self
    }

    /// The base endpoint, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// `endpoint` joined with `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// A request carrying the adapter's headers and timeout.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .headers(self.headers.clone());
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    /// A JSON POST to `url`.
    pub fn post(&self, url: &str, body: &impl Serialize) -> RequestBuilder {
        if let Ok(body) = serde_json::to_string(body) {
            tracing::trace!(provider = %self.provider, "request: {body}");
        }
        self.request(Method::POST, url).json(body)
    }

    /// Send `request` and decode the JSON response body.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send_raw(request).await.map(|(value, _)| value)
    }

    /// [`send`](Self::send), also returning the raw body so later
    /// payload errors can carry it.
    pub async fn send_raw<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(T, String)> {
        let response = open(self.provider, request).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| transport(self.provider, e))?;
        tracing::trace!(provider = %self.provider, "response: {text}");
        match serde_json::from_str(&text) {
            Ok(value) => Ok((value, text)),
            Err(e) => Err(Error::response(
                self.provider,
                Some(status),
                format!("failed to decode response: {e}"),
                text,
            )),
        }
    }
}

/// Send `request`, mapping error statuses into the error taxonomy.
///
/// The returned response is positioned at the start of its body, ready to
/// be read whole or as a stream.
pub async fn open(provider: ProviderId, request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| transport(provider, e))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let payload = response.text().await.unwrap_or_default();
    let message = error_message(&payload)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());
    tracing::debug!(%provider, status = status.as_u16(), "provider error: {message}");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::auth(provider, message),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit {
            provider,
            message,
            retry_after,
        },
        _ => Error::response(provider, Some(status.as_u16()), message, payload),
    })
}

/// A transport error for `provider`.
pub fn transport(provider: ProviderId, e: reqwest::Error) -> Error {
    Error::Transport {
        provider,
        source: Box::new(e),
    }
}

/// Extract a readable message from a provider error payload.
///
/// Recognizes `{"error": {"message": ..}}`, `{"message": ..}`,
/// `{"error": ".."}` and `{"detail": ..}`.
pub fn error_message(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let value = match &value {
        Value::Array(items) => items.first()?,
        _ => &value,
    };
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .or_else(|| value.get("detail"))?;
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn sensitive(provider: ProviderId, value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| Error::auth(provider, "credential contains invalid header characters"))?;
    value.set_sensitive(true);
    Ok(value)
}
