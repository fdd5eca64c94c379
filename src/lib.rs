//! syno-trigger - Synology notification trigger
//!
//! Library behind the `syno-trigger` and `syno-mock-alerts` binaries.

pub mod cli;
pub mod constants;
pub mod core;
pub mod logger;
pub mod mock_alerts;
pub mod models;
pub mod platform;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{Dispatcher, NasSession, RunSummary, TestCatalog, TriggerResult};
pub use models::{Credentials, NasTarget, SecureString, Transport, Username};
pub use utils::{ArgumentError, CatalogError, SessionError, TriggerError};
