//! Process-wide observable session state.
//!
//! One [`SessionStore`] is shared by the API gateway (which resets it on a
//! 401) and the session manager (which drives every other transition).
//! Front ends hold a `watch::Receiver` and re-render on change.

use std::sync::Arc;

use tokio::sync::watch;

use vanaspati_core::Session;

/// Session lifecycle.
///
/// `Uninitialized → Checking → {Authenticated, Anonymous}`; afterwards login,
/// logout and 401 responses move between `Authenticated` and `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Checking,
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_some_and(|s| s.is_admin)
    }

    /// Initialization has finished (either way).
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Anonymous)
    }
}

/// Shared handle to the current [`SessionState`]. Cloning shares the state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SessionState::Uninitialized);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Replace the state and notify subscribers when it changed.
    pub fn set(&self, state: SessionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
