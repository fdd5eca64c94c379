//! # Utilities Module
//!
//! Cross-cutting concerns shared by the session, catalog and CLI layers.
//!
//! ## Modules
//!
//! - [`errors`]: Typed error hierarchy using `thiserror` for domain-specific errors
//!
//! ## Design Notes
//!
//! Error types live here so that `core` and `platform` can both return them
//! without depending on each other. Per-test failures are not errors at this
//! level: the dispatcher folds them into failed `TriggerResult`s, and only
//! authentication, argument and catalog errors reach the process boundary.

pub mod errors;

pub use errors::{
    exit, ArgumentError, CatalogError, CredentialError, MockAlertError, SessionError,
    TriggerError,
};
