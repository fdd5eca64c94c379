//! Credential types for NAS logins
//!
//! SECURITY: Credential types implement Drop to clear sensitive data.

use crate::utils::CredentialError;
use std::fmt;

/// DSM account name
///
/// DSM accepts local accounts (`admin`), domain accounts (`DOMAIN\\user`)
/// and LDAP accounts (`user@ldap.example`), so only length is checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Create a new username after validation
    pub fn new(username: impl Into<String>) -> Result<Self, CredentialError> {
        let username = username.into();
        let trimmed = username.trim();

        if trimmed.is_empty() {
            return Err(CredentialError::InvalidUsername(
                "Username cannot be empty".to_string(),
            ));
        }

        if trimmed.len() > 256 {
            return Err(CredentialError::InvalidUsername(
                "Username exceeds maximum length (256)".to_string(),
            ));
        }

        Ok(Username(trimmed.to_string()))
    }

    /// Get the username as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Username {
    type Error = CredentialError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Username::new(value)
    }
}

/// Password that zeros memory on drop
///
/// SECURITY: This type never implements Display or Debug in a way that reveals the password.
#[derive(Clone)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(password: impl Into<String>) -> Self {
        SecureString(password.into())
    }

    /// Get the password as a string slice
    ///
    /// Use this sparingly and only when handing the secret to a transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        // SAFETY: We own this String and overwrite it with zeros, which is valid UTF-8
        unsafe {
            let bytes = self.0.as_bytes_mut();
            for byte in bytes {
                std::ptr::write_volatile(byte, 0);
            }
        }
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(*** {} bytes ***)", self.0.len())
    }
}

/// Account credentials for one NAS login
#[derive(Clone, Debug)]
pub struct Credentials {
    username: Username,
    password: SecureString,
}

impl Credentials {
    pub fn new(username: Username, password: SecureString) -> Self {
        Credentials { username, password }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn password(&self) -> &SecureString {
        &self.password
    }
}
