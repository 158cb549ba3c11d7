//! Session manager: login, signup, logout and start-up token validation.
//!
//! State transitions are published through the shared [`SessionStore`]; the
//! gateway resets it to `Anonymous` on its own when the server answers 401.

use reqwest::Method;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use vanaspati_core::logging::component;
use vanaspati_core::{
    validate_login, validate_signup, ClientEvent, LoginResponse, Result, Session, SignupResponse,
};

use crate::gateway::ApiClient;
use crate::state::{SessionState, SessionStore};

/// Drives the [`SessionState`] machine against the auth endpoints.
#[derive(Debug, Clone)]
pub struct SessionManager {
    api: ApiClient,
}

impl SessionManager {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn store(&self) -> &SessionStore {
        self.api.session_store()
    }

    /// Validate a stored token against `GET /auth/me`.
    ///
    /// Any failure, including a network error, discards the stored
    /// credentials and leaves the session anonymous. Never returns an error.
    pub async fn initialize(&self) -> SessionState {
        self.store().set(SessionState::Checking);

        if !self.api.has_token() {
            debug!(
                component = component::SESSION,
                op = "initialize",
                "No stored token"
            );
            self.store().set(SessionState::Anonymous);
            return self.store().current();
        }

        match self
            .api
            .execute_json::<Session, _>(Method::GET, "/auth/me", |req| req)
            .await
        {
            Ok(session) => {
                info!(
                    component = component::SESSION,
                    op = "initialize",
                    username = %session.username,
                    is_admin = session.is_admin,
                    "Stored token accepted"
                );
                self.authenticate(session);
            }
            Err(e) => {
                warn!(
                    component = component::SESSION,
                    op = "initialize",
                    error = %e,
                    "Stored token rejected, signing out"
                );
                self.sign_out();
            }
        }

        self.store().current()
    }

    /// Exchange credentials for a token.
    ///
    /// On success the token and identity are persisted and the session
    /// becomes authenticated. On failure nothing is stored.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<LoginResponse> {
        validate_login(identifier, password)?;

        let response: LoginResponse = self
            .api
            .execute_json(Method::POST, "/auth/login", |req| {
                req.form(&[("username", identifier), ("password", password)])
            })
            .await?;

        let session = response.session();
        self.api
            .credentials()
            .store_login(&response.access_token, &session)?;

        info!(
            component = component::SESSION,
            op = "login",
            username = %session.username,
            is_admin = session.is_admin,
            "Logged in"
        );
        self.authenticate(session);

        Ok(response)
    }

    /// Register a new account.
    ///
    /// Input is checked locally first; an invalid form never reaches the
    /// server. A successful signup does not log the user in.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<SignupResponse> {
        validate_signup(username, email, password, confirmation)?;

        let response: SignupResponse = self
            .api
            .execute_json(Method::POST, "/auth/signup", |req| {
                req.query(&[
                    ("username", username),
                    ("email", email),
                    ("password", password),
                ])
            })
            .await?;

        info!(
            component = component::SESSION,
            op = "signup",
            username,
            "Account created"
        );
        Ok(response)
    }

    /// Forget the local session. No server call is made.
    pub fn logout(&self) -> Result<()> {
        self.api.credentials().clear_session()?;
        self.store().set(SessionState::Anonymous);
        self.api.events().emit(ClientEvent::SignedOut);
        info!(component = component::SESSION, op = "logout", "Logged out");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.store().current()
    }

    pub fn session(&self) -> Option<Session> {
        self.state().session().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.state().is_admin()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store().subscribe()
    }

    fn authenticate(&self, session: Session) {
        self.api.events().emit(ClientEvent::Authenticated {
            username: session.username.clone(),
            is_admin: session.is_admin,
        });
        self.store().set(SessionState::Authenticated(session));
    }

    fn sign_out(&self) {
        if let Err(e) = self.api.credentials().clear_session() {
            warn!(
                component = component::CREDENTIALS,
                error = %e,
                "Failed to clear credential store"
            );
        }
        self.store().set(SessionState::Anonymous);
        self.api.events().emit(ClientEvent::SignedOut);
    }
}
