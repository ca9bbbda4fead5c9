//! Authenticated HTTP client with a single response interceptor.
//!
//! Every request goes through [`RequestClient::request`], which attaches the
//! bearer token of the current session and an `X-Request-Time` header. Every
//! failure goes through the interceptor, which:
//!
//! - on 401 clears the session and publishes [`UiSignal::SessionExpired`]
//! - on 403, 429, 5xx and transport failures publishes a toast
//! - leaves other statuses to the caller
//!
//! The typed error is returned to the caller in every case.

use std::sync::Arc;
use std::time::Duration;

use finboard_auth::SessionStore;
use finboard_core::UiSignal;
use finboard_settings::ApiSettings;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, RequestBuilder, Response, multipart};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::errors::ApiError;

/// Header carrying the client's send time in epoch milliseconds.
pub const REQUEST_TIME_HEADER: &str = "x-request-time";

/// Bytes left unescaped in a path segment (RFC 3986 unreserved).
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode an id as a single URL path segment.
///
/// Returns `None` for ids that cannot name a segment: blank ones, and `.`
/// or `..`, which URL normalisation would resolve against the parent path.
pub fn path_segment(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return None;
    }
    Some(utf8_percent_encode(raw, SEGMENT).to_string())
}

/// Shared HTTP client for every backend call.
#[derive(Clone, Debug)]
pub struct RequestClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    signals: EventBus<UiSignal>,
}

impl RequestClient {
    /// Build a client from API settings.
    pub fn new(
        settings: &ApiSettings,
        session: Arc<SessionStore>,
        signals: EventBus<UiSignal>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        Ok(Self::with_http(http, &settings.base_url, session, signals))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_http(
        http: reqwest::Client,
        base_url: &str,
        session: Arc<SessionStore>,
        signals: EventBus<UiSignal>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            signals,
        }
    }

    /// Base URL every path is resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session whose token is attached to requests.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Bus the interceptor publishes toasts and session expiry to.
    pub fn signals(&self) -> &EventBus<UiSignal> {
        &self.signals
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with the auth and timestamp headers attached.
    ///
    /// The token is read at call time, so a login on another task is picked
    /// up by the next request.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let sent_at = chrono::Utc::now().timestamp_millis();
        let mut builder = self
            .http
            .request(method, self.url(path))
            .header(REQUEST_TIME_HEADER, sent_at.to_string());
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// `GET` and decode JSON.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, path)).await
    }

    /// `POST` a JSON body and decode JSON.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::POST, path).json(body))
            .await
    }

    /// `PUT` a JSON body and decode JSON.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(self.request(Method::PUT, path).json(body))
            .await
    }

    /// `DELETE`, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _ = self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// `POST` a multipart form and decode JSON.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ApiError> {
        self.send_json(self.request(Method::POST, path).multipart(form))
            .await
    }

    /// Send a prepared request and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.intercept(ApiError::from_transport(&e)))?;
        serde_json::from_slice(&bytes).map_err(|e| self.intercept(ApiError::Decode(e.to_string())))
    }

    /// Send a prepared request, routing failures through the interceptor.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.intercept(ApiError::from_transport(&e))),
        };

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response");
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Err(self.intercept(ApiError::from_status(
            status.as_u16(),
            &body,
            retry_after,
        )))
    }

    fn intercept(&self, error: ApiError) -> ApiError {
        warn!(
            kind = error.error_kind(),
            status = ?error.status(),
            error = %error,
            "request failed"
        );
        if error.is_auth_failure() {
            if let Err(e) = self.session.clear() {
                warn!(error = %e, "failed to clear session after 401");
            }
            let _ = self.signals.publish(UiSignal::SessionExpired);
        } else if let Some(toast) = error.toast() {
            let _ = self.signals.publish(UiSignal::Toast(toast));
        }
        error
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
