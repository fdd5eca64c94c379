//! Transport implementations of [`NasSession`]
//!
//! All network code is isolated here; `core` only sees the trait.

pub mod ssh;
pub mod webapi;

pub use ssh::SshSession;
pub use webapi::{WebApiOptions, WebApiSession};

use crate::core::NasSession;
use crate::models::{Credentials, NasTarget, Transport};
use crate::utils::SessionError;

/// Per-run connection options
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Wrap SSH commands in `sudo -S`
    pub use_sudo: bool,
    pub web: WebApiOptions,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            use_sudo: true,
            web: WebApiOptions::default(),
        }
    }
}

/// Authenticate against the NAS over the chosen transport
///
/// A single attempt is made; the caller decides what a failure means.
pub async fn connect(
    transport: Transport,
    target: &NasTarget,
    credentials: &Credentials,
    options: &ConnectOptions,
) -> Result<Box<dyn NasSession>, SessionError> {
    match transport {
        Transport::Ssh => Ok(Box::new(
            SshSession::connect(target, credentials, options.use_sudo).await?,
        )),
        Transport::Api => Ok(Box::new(
            WebApiSession::login(target, credentials, &options.web).await?,
        )),
    }
}
