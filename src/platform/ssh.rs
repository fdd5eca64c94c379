//! NAS session over SSH
//!
//! Runs the DSM command-line tools (`synowebapi`, `synodsmnotify`,
//! `synonotify`) on the NAS. One authenticated `ssh2::Session` is kept for
//! the whole run; each command opens a fresh channel on it.

use crate::constants::{SSH_COMMAND_TIMEOUT_SECS, SSH_CONNECT_TIMEOUT_SECS};
use crate::core::session::{ApiCall, ApiResponse, NasSession, ShellOutput};
use crate::models::{Credentials, NasTarget, SecureString, Transport};
use crate::utils::SessionError;
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

/// Marker echoed back by the post-login connectivity check
const CONNECT_CHECK_MARKER: &str = "Connection successful";

pub struct SshSession {
    host: String,
    session: Arc<Mutex<Session>>,
    password: SecureString,
    use_sudo: bool,
}

impl SshSession {
    /// Establish an SSH session using password authentication.
    ///
    /// Host-key checking is not performed; this tool targets a NAS on the
    /// local network chosen explicitly by the operator.
    pub async fn connect(
        target: &NasTarget,
        credentials: &Credentials,
        use_sudo: bool,
    ) -> Result<Self, SessionError> {
        info!(
            host = %target.host,
            port = target.port,
            user = %credentials.username(),
            "opening SSH session"
        );

        let host = target.host.clone();
        let port = target.port;
        let username = credentials.username().as_str().to_string();
        let password = credentials.password().clone();
        let auth_password = password.clone();

        let session = tokio::task::spawn_blocking(move || {
            open_session(&host, port, &username, auth_password.as_str())
        })
        .await
        .map_err(|e| SessionError::Transport(format!("SSH task failed: {e}")))??;

        let session = Self {
            host: target.host.clone(),
            session: Arc::new(Mutex::new(session)),
            password,
            use_sudo,
        };

        // Quick connectivity check, mirrors what the operator would type first
        let check = session
            .run(&format!("echo '{}'", CONNECT_CHECK_MARKER), false)
            .await?;
        if !check.success() || !check.stdout.contains(CONNECT_CHECK_MARKER) {
            error!(host = %session.host, output = %check.message(), "SSH connectivity check failed");
            return Err(SessionError::Transport(format!(
                "SSH connectivity check failed: {}",
                check.message()
            )));
        }

        info!(host = %session.host, "SSH session ready");
        Ok(session)
    }

    /// Run a command, optionally under `sudo -S` with the login password on stdin
    async fn run(&self, command: &str, sudo: bool) -> Result<ShellOutput, SessionError> {
        let session = Arc::clone(&self.session);
        let (full_command, stdin) = privileged_command(command, &self.password, sudo);

        debug!(host = %self.host, command = %full_command, "exec");

        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| SessionError::Transport("SSH session lock poisoned".to_string()))?;
            exec_blocking(&session, &full_command, stdin.as_deref())
        })
        .await
        .map_err(|e| SessionError::Transport(format!("SSH task failed: {e}")))?
    }
}

/// Command line and stdin for running `command`, optionally under sudo
///
/// `sudo -S -p ''` reads the password from stdin without printing a prompt,
/// so the password never appears on the command line.
fn privileged_command(
    command: &str,
    password: &SecureString,
    sudo: bool,
) -> (String, Option<String>) {
    if sudo {
        (
            format!("sudo -S -p '' {}", command),
            Some(format!("{}\n", password.as_str())),
        )
    } else {
        (command.to_string(), None)
    }
}

fn open_session(
    host: &str,
    port: u16,
    username: &str,
    password: &str,
) -> Result<Session, SessionError> {
    let timeout = Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS);
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|e| SessionError::Transport(format!("Could not resolve {}: {}", host, e)))?
        .next()
        .ok_or_else(|| SessionError::Transport(format!("No address for {}", host)))?;

    let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        SessionError::Transport(format!("SSH connect to {}:{} failed: {}", host, port, e))
    })?;
    tcp.set_read_timeout(Some(Duration::from_secs(SSH_COMMAND_TIMEOUT_SECS)))
        .ok();
    tcp.set_write_timeout(Some(timeout)).ok();

    let mut sess =
        Session::new().map_err(|e| SessionError::Transport(format!("SSH session init failed: {e}")))?;
    sess.set_tcp_stream(tcp);
    sess.set_timeout((SSH_COMMAND_TIMEOUT_SECS * 1000) as u32);
    sess.handshake()
        .map_err(|e| SessionError::Transport(format!("SSH handshake failed: {e}")))?;

    sess.userauth_password(username, password)
        .map_err(|e| SessionError::Authentication(format!("SSH login rejected: {e}")))?;
    if !sess.authenticated() {
        return Err(SessionError::Authentication(
            "SSH login rejected".to_string(),
        ));
    }

    Ok(sess)
}

fn exec_blocking(
    session: &Session,
    command: &str,
    stdin: Option<&str>,
) -> Result<ShellOutput, SessionError> {
    let mut channel = session
        .channel_session()
        .map_err(|e| SessionError::Transport(format!("SSH channel open failed: {e}")))?;
    channel
        .exec(command)
        .map_err(|e| SessionError::Transport(format!("SSH exec failed: {e}")))?;

    if let Some(input) = stdin {
        channel
            .write_all(input.as_bytes())
            .map_err(|e| SessionError::Transport(format!("SSH write failed: {e}")))?;
    }
    channel.send_eof().ok();

    let mut stdout = String::new();
    channel
        .read_to_string(&mut stdout)
        .map_err(|e| SessionError::Transport(format!("SSH read failed: {e}")))?;
    let mut stderr = String::new();
    let _ = channel.stderr().read_to_string(&mut stderr);
    channel.wait_close().ok();
    let exit_code = channel.exit_status().unwrap_or(-1);

    Ok(ShellOutput {
        exit_code,
        stdout,
        stderr,
    })
}

/// Turn `synowebapi` output into an API reply
fn interpret_cli_reply(output: &ShellOutput) -> Result<ApiResponse, SessionError> {
    if !output.success() {
        let message = output.message();
        return Err(SessionError::Invocation(if message.is_empty() {
            format!("command failed with status {}", output.exit_code)
        } else {
            format!("command failed with status {}: {}", output.exit_code, message)
        }));
    }
    ApiResponse::parse_cli_output(&output.stdout)
}

#[async_trait::async_trait]
impl NasSession for SshSession {
    fn transport(&self) -> Transport {
        Transport::Ssh
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn call(&self, call: &ApiCall) -> Result<ApiResponse, SessionError> {
        let output = self
            .run(&call.to_synowebapi_command(), self.use_sudo)
            .await?;
        interpret_cli_reply(&output)
    }

    async fn exec_shell(&self, command: &str) -> Result<ShellOutput, SessionError> {
        self.run(command, self.use_sudo).await
    }

    async fn close(&self) -> Result<(), SessionError> {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let session = session
                .lock()
                .map_err(|_| SessionError::Transport("SSH session lock poisoned".to_string()))?;
            session
                .disconnect(None, "bye", None)
                .map_err(|e| SessionError::Transport(format!("SSH disconnect failed: {e}")))
        })
        .await
        .map_err(|e| SessionError::Transport(format!("SSH task failed: {e}")))??;
        debug!(host = %self.host, "SSH session closed");
        Ok(())
    }
}
