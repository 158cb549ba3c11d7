//! # vanaspati-core
//!
//! Core types, traits, and abstractions for the vanaspati diagnosis client.
//!
//! This crate holds the data model shared by the synchronization client and
//! its front ends: sessions, diagnosis records, garden plants, the error
//! type, the client event bus, and small pure helpers (class-name
//! formatting, signup validation). It performs no I/O of its own.

pub mod class_name;
pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use class_name::{disease_name_of, format_class_name, is_healthy, plant_name_of};
pub use error::{Error, Result};
pub use events::{ClientEvent, EventBus, EventEnvelope};
pub use models::*;
pub use traits::CredentialStore;
pub use validation::{validate_login, validate_password, validate_signup};
