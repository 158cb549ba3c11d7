//! API gateway: the single HTTP entry point.
//!
//! Every request picks up `Authorization: Bearer <token>` when the
//! credential store holds a token at build time. Every response goes through
//! [`ApiClient::check`]: a 401 from any endpoint clears the stored session
//! keys, resets the shared session store, and emits
//! [`ClientEvent::LoginRequired`] before the caller sees
//! [`Error::Unauthorized`]. Callers never handle 401 themselves.
//!
//! Components holding per-user state register a reset with
//! [`ApiClient::on_unauthorized`]; it runs on the same path.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use vanaspati_core::logging::component;
use vanaspati_core::{ClientEvent, CredentialStore, Error, EventBus, Result};

use crate::config::ClientConfig;
use crate::state::{SessionState, SessionStore};

/// Shared HTTP client. Cloning is cheap and shares credentials, session
/// state and the event bus.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    session: SessionStore,
    events: EventBus,
    reset_hooks: RwLock<Vec<ResetHook>>,
}

type ResetHook = Box<dyn Fn() + Send + Sync>;

impl ApiClient {
    /// Create a gateway with a fresh session store and event bus.
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Self::with_parts(config, credentials, SessionStore::new(), EventBus::default())
    }

    /// Create a gateway around existing session state and event bus.
    pub fn with_parts(
        config: ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        session: SessionStore,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_seconds));
        if let Some(ref agent) = config.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| Error::Config(format!("Invalid user agent: {}", e)))?;
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(USER_AGENT, value);
            builder = builder.default_headers(headers);
        }

        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            component = component::GATEWAY,
            base_url = %config.base_url,
            timeout_secs = config.timeout_seconds,
            "Initializing API client"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                credentials,
                session,
                events,
                reset_hooks: RwLock::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.credentials
    }

    pub fn session_store(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Register a reset to run whenever the server rejects the session.
    pub fn on_unauthorized<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .reset_hooks
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(Box::new(hook));
    }

    /// True when a token is stored right now. A snapshot only.
    pub fn has_token(&self) -> bool {
        self.inner.credentials.token().is_some()
    }

    /// Build a request for `path`, attaching the bearer token if one is stored.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.inner.config.url(path);
        let req = self.inner.http.request(method, url);

        match self.inner.credentials.token() {
            Some(token) => req.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => req,
        }
    }

    /// Send a request and run the response through [`check`](Self::check).
    ///
    /// `build` customizes the request (query, form, JSON body) after the
    /// bearer header has been attached.
    pub async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let authenticated = self.has_token();
        let started = Instant::now();
        let req = build(self.request(method.clone(), path));

        let response = req.send().await.map_err(|e| {
            warn!(
                component = component::GATEWAY,
                method = %method,
                path,
                error = %e,
                "Request failed"
            );
            Error::Request(format!("{} {} failed: {}", method, path, e))
        })?;

        debug!(
            component = component::GATEWAY,
            method = %method,
            path,
            status = response.status().as_u16(),
            authenticated,
            duration_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        self.check(path, response).await
    }

    /// Send and decode a JSON response body.
    pub async fn execute_json<T, F>(&self, method: Method, path: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let response = self.execute(method, path, build).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Serialization(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// Send and return the body as loose JSON; an empty body is `Null`.
    pub async fn execute_value<F>(&self, method: Method, path: &str, build: F) -> Result<JsonValue>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let response = self.execute(method, path, build).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&body).map_err(|e| {
            Error::Serialization(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// Map a response to `Ok` or an error, applying the 401 policy.
    pub async fn check(&self, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_detail(status, response.text().await.unwrap_or_default());

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(path);
            return Err(Error::Unauthorized(detail));
        }

        Err(Error::Api {
            status: status.as_u16(),
            detail,
        })
    }

    /// Global reaction to a rejected token.
    fn handle_unauthorized(&self, path: &str) {
        let redirect_to = self.inner.config.login_path.clone();
        warn!(
            component = component::GATEWAY,
            path,
            redirect_to = %redirect_to,
            "Server rejected credentials, clearing session"
        );

        if let Err(e) = self.inner.credentials.clear_session() {
            warn!(
                component = component::CREDENTIALS,
                error = %e,
                "Failed to clear credential store"
            );
        }
        self.inner.session.set(SessionState::Anonymous);
        for reset in self
            .inner
            .reset_hooks
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
        {
            reset();
        }
        self.inner.events.emit(ClientEvent::LoginRequired {
            redirect_to,
            path: path.to_string(),
        });
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("has_token", &self.has_token())
            .finish()
    }
}

/// Human-readable error text from a failed response body.
///
/// The server reports errors as `{"detail": "..."}`; validation errors carry
/// a list under `detail`. Falls back to the raw body, then the status reason.
fn error_detail(status: StatusCode, body: String) -> String {
    if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(&body) {
        match map.get("detail") {
            Some(JsonValue::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string()
}
