//! Mock NAS session for testing without a real device
//!
//! Records every invocation and replays scripted replies, so dispatcher
//! tests can assert exactly which calls were made and in what order.

use super::session::{ApiCall, ApiResponse, NasSession, ShellOutput};
use crate::models::Transport;
use crate::utils::SessionError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted reply for one API name
#[derive(Debug, Clone)]
pub enum MockReply {
    /// `success: true` with this `data`
    Success(Value),
    /// `success: false` with this vendor error code
    ApiError(i64),
    /// This exact reply body
    Raw(String),
    /// No reply at all (connection dropped, timeout)
    Transport(String),
}

/// Mock session for testing
///
/// APIs without a scripted reply succeed with empty data. Shell commands
/// succeed unless their first word has a scripted exit code.
pub struct MockSession {
    transport: Transport,
    replies: HashMap<String, MockReply>,
    shell_exit_codes: HashMap<String, i32>,
    calls: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl MockSession {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            replies: HashMap::new(),
            shell_exit_codes: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            closed: Mutex::new(false),
        }
    }

    pub fn ssh() -> Self {
        Self::new(Transport::Ssh)
    }

    pub fn api() -> Self {
        Self::new(Transport::Api)
    }

    pub fn reply(mut self, api: &str, reply: MockReply) -> Self {
        self.replies.insert(api.to_string(), reply);
        self
    }

    /// Make shell commands starting with `program` exit with `code`
    pub fn shell_exit(mut self, program: &str, code: i32) -> Self {
        self.shell_exit_codes.insert(program.to_string(), code);
        self
    }

    /// Every invocation so far: API names for calls, full lines for shell commands
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl NasSession for MockSession {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn host(&self) -> &str {
        "mock-nas"
    }

    async fn call(&self, call: &ApiCall) -> Result<ApiResponse, SessionError> {
        self.calls.lock().unwrap().push(call.api.clone());

        match self.replies.get(&call.api) {
            None => Ok(ApiResponse {
                success: true,
                data: Value::Null,
                error_code: None,
                error_detail: None,
                raw: r#"{"success":true}"#.to_string(),
            }),
            Some(MockReply::Success(data)) => Ok(ApiResponse {
                success: true,
                data: data.clone(),
                error_code: None,
                error_detail: None,
                raw: json!({ "success": true, "data": data }).to_string(),
            }),
            Some(MockReply::ApiError(code)) => Ok(ApiResponse {
                success: false,
                data: Value::Null,
                error_code: Some(*code),
                error_detail: None,
                raw: json!({ "success": false, "error": { "code": code } }).to_string(),
            }),
            Some(MockReply::Raw(body)) => ApiResponse::parse(body),
            Some(MockReply::Transport(message)) => Err(SessionError::Transport(message.clone())),
        }
    }

    async fn exec_shell(&self, command: &str) -> Result<ShellOutput, SessionError> {
        if self.transport != Transport::Ssh {
            return Err(SessionError::Invocation(
                "Shell commands are not available over the api transport".to_string(),
            ));
        }

        self.calls.lock().unwrap().push(command.to_string());
        let program = command.split_whitespace().next().unwrap_or_default();
        let exit_code = self.shell_exit_codes.get(program).copied().unwrap_or(0);

        Ok(ShellOutput {
            exit_code,
            stdout: if exit_code == 0 {
                "sent".to_string()
            } else {
                String::new()
            },
            stderr: if exit_code == 0 {
                String::new()
            } else {
                format!("{}: failed", program)
            },
        })
    }

    async fn close(&self) -> Result<(), SessionError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_calls() {
        let session = MockSession::api();
        session
            .call(&ApiCall::new("SYNO.Core.Notification.Push", "send_test", 1))
            .await
            .unwrap();
        assert_eq!(session.calls(), vec!["SYNO.Core.Notification.Push"]);
    }

    #[tokio::test]
    async fn test_mock_scripted_error() {
        let session = MockSession::api().reply("X", MockReply::ApiError(105));
        let response = session.call(&ApiCall::new("X", "get", 1)).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.error_code, Some(105));
    }

    #[tokio::test]
    async fn test_mock_shell_requires_ssh() {
        let session = MockSession::api();
        assert!(session.exec_shell("echo hi").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_close() {
        let session = MockSession::ssh();
        assert!(!session.is_closed());
        session.close().await.unwrap();
        assert!(session.is_closed());
    }
}
