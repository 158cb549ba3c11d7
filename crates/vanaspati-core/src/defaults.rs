//! Centralized default constants for the vanaspati client.
//!
//! **This module is the single source of truth** for shared default values.
//! The client crate and the CLI reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// SERVER
// =============================================================================

/// Default API base URL (local development server).
pub const API_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds.
pub const TIMEOUT_SECS: u64 = 30;

/// Client-side route a 401 response redirects to.
pub const LOGIN_PATH: &str = "/login";

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for the diagnosis history endpoint.
pub const HISTORY_PAGE_LIMIT: u32 = 50;

/// Default page offset.
pub const PAGE_OFFSET: u32 = 0;

// =============================================================================
// CREDENTIAL STORE KEYS
// =============================================================================

/// Bearer token.
pub const KEY_TOKEN: &str = "token";

/// Cached username of the logged-in account.
pub const KEY_USERNAME: &str = "username";

/// Cached email of the logged-in account.
pub const KEY_EMAIL: &str = "email";

/// Cached admin flag ("true"/"false").
pub const KEY_IS_ADMIN: &str = "isAdmin";

/// Every key the client writes; cleared together on logout or 401.
pub const SESSION_KEYS: [&str; 4] = [KEY_TOKEN, KEY_USERNAME, KEY_EMAIL, KEY_IS_ADMIN];

// =============================================================================
// RECORD DEFAULTS
// =============================================================================

/// Status the server assigns to freshly saved diagnosis records.
pub const HISTORY_STATUS_ACTIVE: &str = "active";

// =============================================================================
// CONFIDENCE BANDS
// =============================================================================

/// Confidence at or above which a prediction is shown as high.
pub const CONFIDENCE_HIGH: f64 = 0.8;

/// Confidence at or above which a prediction is shown as medium.
pub const CONFIDENCE_MEDIUM: f64 = 0.5;

// =============================================================================
// PASSWORD POLICY
// =============================================================================

/// Minimum password length accepted by signup.
pub const PASSWORD_MIN_LEN: usize = 8;

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer for the client event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;
