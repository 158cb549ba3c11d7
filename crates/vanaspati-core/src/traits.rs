//! Core traits for the vanaspati client.
//!
//! Implementations live in `vanaspati-client`; front ends may supply their
//! own (an OS keychain, a browser storage bridge).

use crate::defaults::{KEY_EMAIL, KEY_IS_ADMIN, KEY_TOKEN, KEY_USERNAME, SESSION_KEYS};
use crate::error::Result;
use crate::models::Session;

// =============================================================================
// CREDENTIAL STORE
// =============================================================================

/// Persistent key-value storage for the bearer token and cached profile.
///
/// There is no expiry: a stored token is used until the server rejects it.
/// Readers must treat a token as a snapshot; a concurrent 401 may clear the
/// store between two reads.
pub trait CredentialStore: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a single key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key.
    fn clear(&self) -> Result<()>;

    /// Current bearer token.
    fn token(&self) -> Option<String> {
        self.get(KEY_TOKEN).filter(|t| !t.is_empty())
    }

    /// Store the token and the cached profile flags.
    fn store_login(&self, token: &str, session: &Session) -> Result<()> {
        self.set(KEY_TOKEN, token)?;
        self.set(KEY_USERNAME, &session.username)?;
        self.set(KEY_EMAIL, &session.email)?;
        self.set(KEY_IS_ADMIN, if session.is_admin { "true" } else { "false" })
    }

    /// Profile cached at the last login, if complete.
    fn cached_session(&self) -> Option<Session> {
        Some(Session {
            username: self.get(KEY_USERNAME)?,
            email: self.get(KEY_EMAIL)?,
            is_admin: self.get(KEY_IS_ADMIN).is_some_and(|v| v == "true"),
        })
    }

    /// Remove every session key written by the client.
    fn clear_session(&self) -> Result<()> {
        for key in SESSION_KEYS {
            self.remove(key)?;
        }
        Ok(())
    }
}
