//! Structured logging conventions for the vanaspati client.
//!
//! Every crate uses the same `tracing` field names so logs from the library
//! and the CLI can be filtered the same way.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed in a way the caller cannot recover from |
//! | WARN  | 401 interception, failed batch entries, recoverable failures |
//! | INFO  | Lifecycle events (initialize, login, logout), completed mutations |
//! | DEBUG | Outgoing requests, cache decisions |
//! | TRACE | Per-record iteration |
//!
//! ## Field names
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `component` | One of the [`component`] values |
//! | `op` | Logical operation (`login`, `load`, `add`, `clear_all`, ...) |
//! | `method`, `path`, `status` | Outgoing request and its response code |
//! | `authenticated` | Whether a bearer token was attached |
//! | `diagnosis_id`, `plant_id` | Entity ids |
//! | `duration_ms` | Wall-clock duration |
//! | `result_count` | Records returned |
//! | `error` | Error message of a failed operation |

/// Values for the `component` field.
pub mod component {
    pub const GATEWAY: &str = "gateway";
    pub const SESSION: &str = "session";
    pub const HISTORY: &str = "history";
    pub const GARDEN: &str = "garden";
    pub const CREDENTIALS: &str = "credentials";
    pub const CLI: &str = "cli";
}
