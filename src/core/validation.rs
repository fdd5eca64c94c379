//! Input validation for connection targets
//!
//! Turns the raw `--host` / `--port` / `--secure` flags into a [`NasTarget`]
//! before any network activity.

use crate::constants::{
    DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, DEFAULT_SSH_PORT, MAX_HOSTNAME_LENGTH,
};
use crate::models::{NasTarget, Transport};
use crate::utils::ArgumentError;

/// Validate a hostname or IP literal
///
/// Rejects empty values, whitespace, URLs (`https://...`) and paths.
pub fn validate_host(host: &str) -> Result<(), ArgumentError> {
    if host.is_empty() {
        return Err(ArgumentError("host cannot be empty".into()));
    }
    if host.len() > MAX_HOSTNAME_LENGTH {
        return Err(ArgumentError(format!(
            "host exceeds maximum length ({})",
            MAX_HOSTNAME_LENGTH
        )));
    }
    if host.contains("://") {
        return Err(ArgumentError(format!(
            "host '{}' must be a hostname or IP, not a URL (use --secure for HTTPS)",
            host
        )));
    }
    if host.chars().any(|c| c.is_whitespace() || c == '/' || c == '@') {
        return Err(ArgumentError(format!("host '{}' contains invalid characters", host)));
    }
    Ok(())
}

/// Split `host:port`, leaving bare IPv6 literals alone
fn split_host_port(raw: &str) -> Result<(String, Option<u16>), ArgumentError> {
    if let Some(rest) = raw.strip_prefix('[') {
        // [v6]:port or [v6]
        let (host, tail) = rest
            .split_once(']')
            .ok_or_else(|| ArgumentError(format!("unterminated IPv6 literal '{}'", raw)))?;
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host.to_string(), Some(parse_port(port)?))),
            None if tail.is_empty() => Ok((host.to_string(), None)),
            None => Err(ArgumentError(format!("invalid host '{}'", raw))),
        };
    }

    match raw.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Ok((host.to_string(), Some(parse_port(port)?))),
        _ => Ok((raw.to_string(), None)),
    }
}

fn parse_port(port: &str) -> Result<u16, ArgumentError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ArgumentError(format!("invalid port '{}'", port))),
        Ok(p) => Ok(p),
    }
}

/// Default port for a transport
pub fn default_port(transport: Transport, secure: bool) -> u16 {
    match (transport, secure) {
        (Transport::Ssh, _) => DEFAULT_SSH_PORT,
        (Transport::Api, false) => DEFAULT_HTTP_PORT,
        (Transport::Api, true) => DEFAULT_HTTPS_PORT,
    }
}

/// Resolve the connection target from CLI input
///
/// Port precedence: `--port`, then `host:port`, then the transport default.
pub fn resolve_target(
    raw_host: &str,
    port: Option<u16>,
    secure: bool,
    transport: Transport,
) -> Result<NasTarget, ArgumentError> {
    let (host, embedded_port) = split_host_port(raw_host.trim())?;
    validate_host(&host)?;

    if port == Some(0) {
        return Err(ArgumentError("invalid port '0'".into()));
    }

    Ok(NasTarget {
        host,
        port: port
            .or(embedded_port)
            .unwrap_or_else(|| default_port(transport, secure)),
        secure,
    })
}
