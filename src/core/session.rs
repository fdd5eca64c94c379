//! Session abstraction over the SSH and web API transports
//!
//! This trait allows the dispatcher to be tested without a NAS by supporting
//! mock implementations. Transport implementations are in `src/platform/`.

use crate::constants::ENTRY_PATH;
use crate::models::Transport;
use crate::utils::SessionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One DSM web API invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCall {
    /// API name (e.g., "SYNO.Core.Notification.Push")
    pub api: String,
    pub method: String,
    pub version: u32,
    /// CGI path under `/webapi/`
    #[serde(default = "default_path")]
    pub path: String,
    /// Extra request parameters
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_path() -> String {
    ENTRY_PATH.to_string()
}

impl ApiCall {
    pub fn new(api: impl Into<String>, method: impl Into<String>, version: u32) -> Self {
        Self {
            api: api.into(),
            method: method.into(),
            version,
            path: default_path(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set a parameter, replacing an existing value with the same key
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Render as a `synowebapi` command line for the SSH transport
    pub fn to_synowebapi_command(&self) -> String {
        let mut command = format!(
            "synowebapi --exec {} {} --version={}",
            shell_escape::escape(format!("api={}", self.api).into()),
            shell_escape::escape(format!("method={}", self.method).into()),
            self.version
        );
        for (key, value) in &self.params {
            let pair = format!("{}={}", key, value);
            command.push(' ');
            command.push_str(&shell_escape::escape(pair.into()));
        }
        command
    }
}

/// Reply envelope shared by the web API and `synowebapi`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Value,
    /// Vendor error code when `success` is false
    pub error_code: Option<i64>,
    /// Fields of the error object other than `code` (e.g. `errors.reason`)
    pub error_detail: Option<Value>,
    /// Raw response text
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<Value>,
}

impl ApiResponse {
    /// Parse a `{"success": .., "data": .., "error": {"code": ..}}` envelope
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        let envelope: Envelope = serde_json::from_str(raw.trim()).map_err(|e| {
            SessionError::Invocation(format!("Malformed API response: {}", e))
        })?;
        let error_code = envelope
            .error
            .as_ref()
            .and_then(|e| e.get("code"))
            .and_then(Value::as_i64);
        let error_detail = match envelope.error {
            Some(Value::Object(mut fields)) => {
                fields.remove("code");
                (!fields.is_empty()).then_some(Value::Object(fields))
            }
            _ => None,
        };
        Ok(Self {
            success: envelope.success,
            data: envelope.data,
            error_code,
            error_detail,
            raw: raw.to_string(),
        })
    }

    /// Parse `synowebapi` output, which may carry log lines around the JSON body
    pub fn parse_cli_output(stdout: &str) -> Result<Self, SessionError> {
        if let Ok(parsed) = Self::parse(stdout) {
            return Ok(parsed);
        }
        match (stdout.find('{'), stdout.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                let mut parsed = Self::parse(&stdout[start..=end])?;
                parsed.raw = stdout.to_string();
                Ok(parsed)
            }
            _ => Err(SessionError::Invocation(format!(
                "No JSON reply in output: {}",
                stdout.trim()
            ))),
        }
    }

    /// Human-readable failure description
    pub fn describe_error(&self) -> String {
        let summary = match self.error_code {
            Some(code) => format!("error {} ({})", code, describe_api_error(code)),
            None => "request reported success=false".to_string(),
        };
        match &self.error_detail {
            Some(detail) => format!("{}: {}", summary, detail),
            None => summary,
        }
    }
}

/// Meaning of the DSM error codes common to all APIs
pub fn describe_api_error(code: i64) -> &'static str {
    match code {
        100 => "unknown error",
        101 => "invalid parameter",
        102 => "API does not exist",
        103 => "method does not exist",
        104 => "version not supported",
        105 => "permission denied",
        106 => "session timeout",
        107 => "session interrupted by duplicate login",
        119 => "SID not found",
        _ => "API-specific error",
    }
}

/// Output of a remote shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stderr when present, otherwise stdout, trimmed
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Result of one trigger action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerResult {
    /// Test name (e.g., "push", "custom")
    pub name: String,
    pub success: bool,
    /// Short description: reply data, or what went wrong
    pub output: String,
    /// Unprocessed reply (HTTP body or command stdout), empty when none arrived
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw: String,
    /// Execution time in milliseconds
    pub duration_ms: u64,
}

/// Authenticated session with a NAS
///
/// Implementations are opened by `platform::connect` and used sequentially
/// for every action in a run.
#[async_trait::async_trait]
pub trait NasSession: Send + Sync {
    fn transport(&self) -> Transport;

    /// Host this session is connected to
    fn host(&self) -> &str;

    /// Invoke a DSM API.
    ///
    /// `Ok` carries the vendor reply even when it reports `success: false`;
    /// `Err` means no usable reply was obtained.
    async fn call(&self, call: &ApiCall) -> Result<ApiResponse, SessionError>;

    /// Run a raw shell command on the NAS
    ///
    /// SECURITY: Command must be escaped by the caller.
    async fn exec_shell(&self, _command: &str) -> Result<ShellOutput, SessionError> {
        Err(SessionError::Invocation(format!(
            "Shell commands are not available over the {} transport",
            self.transport()
        )))
    }

    /// Release the session (logout / disconnect)
    async fn close(&self) -> Result<(), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synowebapi_command() {
        let call = ApiCall::new("SYNO.Core.Notification.Push", "send_test", 1);
        assert_eq!(
            call.to_synowebapi_command(),
            "synowebapi --exec api=SYNO.Core.Notification.Push method=send_test --version=1"
        );
    }

    #[test]
    fn test_synowebapi_command_escapes_params() {
        let call = ApiCall::new("SYNO.Core.DSMNotify", "notify", 1)
            .with_param("action", "load")
            .with_param("title", "a b");
        let command = call.to_synowebapi_command();
        assert!(command.ends_with("action=load 'title=a b'"));
    }

    #[test]
    fn test_with_param_replaces() {
        let call = ApiCall::new("X", "y", 1)
            .with_param("profile_id", "1")
            .with_param("profile_id", "3");
        assert_eq!(call.params.len(), 1);
        assert_eq!(call.params["profile_id"], "3");
    }

    #[test]
    fn test_parse_success_envelope() {
        let response = ApiResponse::parse(r#"{"data":{"sid":"abc"},"success":true}"#).unwrap();
        assert!(response.success);
        assert_eq!(response.data["sid"], "abc");
        assert_eq!(response.error_code, None);
    }

    #[test]
    fn test_parse_error_envelope() {
        let response = ApiResponse::parse(r#"{"error":{"code":102},"success":false}"#).unwrap();
        assert!(!response.success);
        assert_eq!(response.error_code, Some(102));
        assert_eq!(response.describe_error(), "error 102 (API does not exist)");
    }

    #[test]
    fn test_parse_malformed() {
        let err = ApiResponse::parse("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, SessionError::Invocation(_)));
    }

    #[test]
    fn test_parse_cli_output_with_noise() {
        let stdout = "[Line 254] Exec WebAPI:  api=X, version=1\n{\n   \"success\" : true\n}\n";
        let response = ApiResponse::parse_cli_output(stdout).unwrap();
        assert!(response.success);
        assert_eq!(response.raw, stdout);
    }

    #[test]
    fn test_parse_cli_output_without_json() {
        assert!(ApiResponse::parse_cli_output("sudo: command not found").is_err());
    }

    #[test]
    fn test_trigger_result_serialization() {
        let result = TriggerResult {
            name: "push".to_string(),
            success: true,
            output: "ok".to_string(),
            raw: "{\"success\":true}".to_string(),
            duration_ms: 150,
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"name\":\"push\""));
        assert!(json.contains("\"duration_ms\":150"));
        assert!(json.contains("\"raw\":\"{\\\"success\\\":true}\""));

        let no_reply = TriggerResult {
            raw: String::new(),
            ..result
        };
        assert!(!serde_json::to_string(&no_reply).unwrap().contains("raw"));
    }

    #[test]
    fn test_error_detail_kept() {
        let response = ApiResponse::parse(
            r#"{"success":false,"error":{"code":3001,"errors":{"reason":"push service not paired"}}}"#,
        )
        .unwrap();
        assert_eq!(response.error_code, Some(3001));
        assert_eq!(
            response.error_detail,
            Some(serde_json::json!({ "errors": { "reason": "push service not paired" } }))
        );
        let description = response.describe_error();
        assert!(description.starts_with("error 3001 (API-specific error): "));
        assert!(description.contains("push service not paired"));
    }

    #[test]
    fn test_synowebapi_command_escapes_api_and_method() {
        let call = ApiCall::new("SYNO.X; reboot", "get$(id)", 1);
        assert_eq!(
            call.to_synowebapi_command(),
            "synowebapi --exec 'api=SYNO.X; reboot' 'method=get$(id)' --version=1"
        );
    }
}
