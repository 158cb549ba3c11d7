//! Client event types, envelope, and event bus.
//!
//! The session store, history cache, garden registry and API gateway all
//! publish onto one broadcast channel. Front ends subscribe to drive
//! navigation (a 401 asks for the login screen) and user notifications.
//! Nothing in the core waits on a subscriber.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{PlantStatus, RecordId};

// ============================================================================
// Event Envelope
// ============================================================================

/// Self-describing wrapper around a [`ClientEvent`].
///
/// `event_type` is dot-namespaced (`"history.added"`,
/// `"auth.login_required"`); `event_id` is a UUIDv7 so ids sort by time.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    /// Type of entity this event relates to (`"history"`, `"garden"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Id of the entity this event relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    pub payload: ClientEvent,
}

impl EventEnvelope {
    pub fn new(event: ClientEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            occurred_at: Utc::now(),
            entity_type: event.entity_type().map(String::from),
            entity_id: event.entity_id().map(|id| id.to_string()),
            payload: event,
        }
    }
}

// ============================================================================
// Client Event (domain payloads)
// ============================================================================

/// Everything the client core announces.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"HistoryAdded","diagnosis_id":"12","total":3}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// A session was established (login or token validation).
    Authenticated { username: String, is_admin: bool },
    /// The session ended locally (logout or failed validation).
    SignedOut,
    /// The server rejected the token. Front ends navigate to `redirect_to`.
    LoginRequired {
        redirect_to: String,
        /// API path whose response was a 401.
        path: String,
    },
    /// History was (re)loaded from the server.
    HistoryLoaded { count: usize, total: u64 },
    /// A diagnosis record was saved and mirrored locally.
    HistoryAdded { diagnosis_id: RecordId, total: u64 },
    /// A diagnosis record was deleted.
    HistoryDeleted { diagnosis_id: RecordId, total: u64 },
    /// All history was cleared.
    HistoryCleared,
    /// A garden plant was created.
    GardenPlantSaved { plant_name: String },
    /// A garden plant was updated.
    GardenPlantUpdated {
        plant_id: RecordId,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<PlantStatus>,
    },
    /// A garden plant was removed.
    GardenPlantDeleted { plant_id: RecordId },
}

impl ClientEvent {
    /// Dot-namespaced event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "session.authenticated",
            Self::SignedOut => "session.anonymous",
            Self::LoginRequired { .. } => "auth.login_required",
            Self::HistoryLoaded { .. } => "history.loaded",
            Self::HistoryAdded { .. } => "history.added",
            Self::HistoryDeleted { .. } => "history.deleted",
            Self::HistoryCleared => "history.cleared",
            Self::GardenPlantSaved { .. } => "garden.saved",
            Self::GardenPlantUpdated { .. } => "garden.updated",
            Self::GardenPlantDeleted { .. } => "garden.deleted",
        }
    }

    pub fn entity_type(&self) -> Option<&'static str> {
        match self {
            Self::HistoryLoaded { .. }
            | Self::HistoryAdded { .. }
            | Self::HistoryDeleted { .. }
            | Self::HistoryCleared => Some("history"),
            Self::GardenPlantSaved { .. }
            | Self::GardenPlantUpdated { .. }
            | Self::GardenPlantDeleted { .. } => Some("garden"),
            _ => None,
        }
    }

    pub fn entity_id(&self) -> Option<&RecordId> {
        match self {
            Self::HistoryAdded { diagnosis_id, .. } | Self::HistoryDeleted { diagnosis_id, .. } => {
                Some(diagnosis_id)
            }
            Self::GardenPlantUpdated { plant_id, .. } | Self::GardenPlantDeleted { plant_id } => {
                Some(plant_id)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel shared by all client components.
///
/// Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: ClientEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_type = %envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Each subscriber gets its own independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
