//! # vanaspati-client
//!
//! Authenticated synchronization client for the vanaspati diagnosis API.
//!
//! One [`ApiClient`] carries the bearer token, the shared session state and
//! the event bus; the [`SessionManager`], [`HistoryCache`] and
//! [`GardenRegistry`] are built on top of it. [`VanaspatiClient`] wires all
//! of them together for front ends.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vanaspati_client::{ClientConfig, MemoryCredentialStore, VanaspatiClient};
//!
//! # async fn demo() -> vanaspati_core::Result<()> {
//! let client = VanaspatiClient::new(
//!     ClientConfig::default(),
//!     Arc::new(MemoryCredentialStore::new()),
//! )?;
//! client.session.login("asha", "Secret123").await?;
//! client.history.load().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod garden;
pub mod gateway;
pub mod history;
pub mod session;
pub mod state;

use std::sync::Arc;

use vanaspati_core::{CredentialStore, EventBus, EventEnvelope, Result};

pub use config::{ClientConfig, ConfigError};
pub use credentials::{FileCredentialStore, MemoryCredentialStore};
pub use garden::GardenRegistry;
pub use gateway::ApiClient;
pub use history::{BatchFailure, BatchSaveReport, HistoryCache};
pub use session::SessionManager;
pub use state::{SessionState, SessionStore};

/// All client components over one shared gateway.
#[derive(Debug, Clone)]
pub struct VanaspatiClient {
    pub api: ApiClient,
    pub session: SessionManager,
    pub history: HistoryCache,
    pub garden: GardenRegistry,
}

impl VanaspatiClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        Ok(Self::from_api(ApiClient::new(config, credentials)?))
    }

    pub fn from_api(api: ApiClient) -> Self {
        Self {
            session: SessionManager::new(api.clone()),
            history: HistoryCache::new(api.clone()),
            garden: GardenRegistry::new(api.clone()),
            api,
        }
    }

    pub fn events(&self) -> &EventBus {
        self.api.events()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventEnvelope> {
        self.api.events().subscribe()
    }

    /// Log out and drop the cached history.
    pub fn logout(&self) -> Result<()> {
        self.session.logout()?;
        self.history.reset();
        Ok(())
    }
}
