//! Error types for syno-trigger
//!
//! All error types use thiserror for clean error handling.
//! SECURITY: Error messages MUST NOT contain passwords or sensitive data.

use std::path::PathBuf;

/// Process exit codes used by the CLI frontends
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const TRIGGER_FAILED: u8 = 1;
    pub const USAGE: u8 = 2;
    pub const AUTH: u8 = 3;
    pub const CATALOG: u8 = 4;
}

/// Top-level error type for a trigger run
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl TriggerError {
    /// Exit status the CLI reports for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            TriggerError::Session(_) => exit::AUTH,
            TriggerError::Argument(_) | TriggerError::Credential(_) => exit::USAGE,
            TriggerError::Catalog(CatalogError::UnknownTest { .. }) => exit::USAGE,
            TriggerError::Catalog(_) => exit::CATALOG,
        }
    }
}

/// Errors from NAS session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authentication failed: two-factor code required (pass --otp)")]
    TwoFactorRequired,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invocation failed: {0}")]
    Invocation(String),
}

impl SessionError {
    /// True when the error happened before or during login
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SessionError::Authentication(_) | SessionError::TwoFactorRequired
        )
    }
}

/// Invalid command-line usage
#[derive(Debug, thiserror::Error)]
#[error("Invalid arguments: {0}")]
pub struct ArgumentError(pub String);

/// Errors from loading or querying the test catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Unknown test '{name}' (known tests: {known})")]
    UnknownTest { name: String, known: String },
}

/// Errors from credential construction
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Invalid username format: {0}")]
    InvalidUsername(String),
}

/// Errors from loading mock alert payloads
#[derive(Debug, thiserror::Error)]
pub enum MockAlertError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No mock alerts found in {0}")]
    Empty(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let auth: TriggerError = SessionError::Authentication("bad password".into()).into();
        assert_eq!(auth.exit_code(), exit::AUTH);

        let usage: TriggerError = ArgumentError("--host is required".into()).into();
        assert_eq!(usage.exit_code(), exit::USAGE);

        let unknown: TriggerError = CatalogError::UnknownTest {
            name: "nope".into(),
            known: "push".into(),
        }
        .into();
        assert_eq!(unknown.exit_code(), exit::USAGE);

        let invalid: TriggerError = CatalogError::Invalid("empty".into()).into();
        assert_eq!(invalid.exit_code(), exit::CATALOG);
    }

    #[test]
    fn test_two_factor_is_auth() {
        assert!(SessionError::TwoFactorRequired.is_auth());
        assert!(!SessionError::Transport("refused".into()).is_auth());
        assert!(SessionError::TwoFactorRequired.to_string().contains("--otp"));
    }
}
