//! # Domain Models
//!
//! Credentials and connection targets handed to the session layer.
//!
//! ## Security Design
//!
//! The [`SecureString`] type keeps the NAS password out of logs:
//! - Password data is zeroed on drop
//! - Never exposed in `Debug` or `Display` implementations
//!
//! Credentials are supplied per invocation (flag, environment or prompt) and
//! are never written to disk.

pub mod credentials;
pub mod target;

pub use credentials::{Credentials, SecureString, Username};
pub use target::{NasTarget, Transport};
