//! Connection target for a NAS

use std::fmt;

/// How commands reach the NAS
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    /// Run vendor CLI commands over SSH
    Ssh,
    /// Call the DSM web API over HTTP(S)
    Api,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Ssh => "ssh",
            Transport::Api => "api",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved host/port pair plus the transport security flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NasTarget {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl NasTarget {
    /// Base URL of the DSM web server, without the `/webapi` suffix
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        if self.host.contains(':') {
            // Bare IPv6 literal
            format!("{}://[{}]:{}", scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.port)
        }
    }
}

impl fmt::Display for NasTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
