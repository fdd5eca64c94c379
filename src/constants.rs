//! # Application-Wide Constants
//!
//! Ports, timeouts and vendor identifiers used by the transports and the CLI.

// ============================================================================
// Network Defaults
// ============================================================================

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// DSM web server port over plain HTTP
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// DSM web server port over HTTPS
pub const DEFAULT_HTTPS_PORT: u16 = 5001;

/// Maximum hostname length (characters)
///
/// DNS hostnames are limited to 253 characters (RFC 1035); 255 leaves room
/// for a bracketed IPv6 literal.
pub const MAX_HOSTNAME_LENGTH: usize = 255;

// ============================================================================
// Timeouts
// ============================================================================

/// TCP connect / read / write timeout for SSH sessions (seconds)
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Upper bound on a single remote command (seconds)
///
/// `synowebapi` send_test calls wait on the notification provider, which
/// can take a while for mail relays.
pub const SSH_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Per-request timeout for web API calls (seconds)
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Per-request timeout when posting mock alerts to a webhook (seconds)
pub const WEBHOOK_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Run pacing
// ============================================================================

/// Pause between catalog entries so notifications arrive as separate webhooks
pub const DEFAULT_TEST_DELAY_SECS: f64 = 2.0;

/// Pause between mock alerts
pub const DEFAULT_MOCK_DELAY_SECS: f64 = 1.0;

// ============================================================================
// DSM web API
// ============================================================================

/// Session name passed to `SYNO.API.Auth` login/logout
pub const API_SESSION_NAME: &str = "NotificationTrigger";

/// Auth API name
pub const AUTH_API: &str = "SYNO.API.Auth";

/// CGI path serving the auth API
pub const AUTH_PATH: &str = "auth.cgi";

/// Auth API version used for login (v6 returns the sid in `data.sid`)
pub const AUTH_LOGIN_VERSION: u32 = 6;

/// CGI path serving most other APIs
pub const ENTRY_PATH: &str = "entry.cgi";

/// API listing API
pub const INFO_API: &str = "SYNO.API.Info";

/// CGI path serving the API listing
pub const INFO_PATH: &str = "query.cgi";

// ============================================================================
// Logging
// ============================================================================

/// Environment variable naming an optional log file
pub const LOG_FILE_ENV: &str = "SYNO_TRIGGER_LOG_FILE";

/// Log file size at which it is rotated to `.bak`
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;
