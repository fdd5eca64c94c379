//! NAS session over the DSM web API
//!
//! Logs in through `SYNO.API.Auth` and sends every subsequent call as a form
//! POST to `/webapi/<path>` carrying the session id (`_sid`).

use crate::constants::{
    API_SESSION_NAME, AUTH_API, AUTH_LOGIN_VERSION, AUTH_PATH, HTTP_REQUEST_TIMEOUT_SECS,
};
use crate::core::session::{ApiCall, ApiResponse, NasSession};
use crate::models::{Credentials, NasTarget, Transport};
use crate::utils::SessionError;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options for the HTTP client
#[derive(Debug, Clone, Default)]
pub struct WebApiOptions {
    /// Verify the NAS TLS certificate (most units ship a self-signed one)
    pub verify_tls: bool,
    /// Two-factor one-time code
    pub otp_code: Option<String>,
}

pub struct WebApiSession {
    client: reqwest::Client,
    base_url: String,
    host: String,
    sid: String,
}

/// Map a `SYNO.API.Auth` error code to a session error
fn auth_error(code: Option<i64>) -> SessionError {
    let reason = match code {
        Some(403) | Some(406) => return SessionError::TwoFactorRequired,
        Some(400) => "no such account or incorrect password",
        Some(401) => "account disabled",
        Some(402) => "permission denied",
        Some(404) => "two-factor code rejected",
        Some(407) => "IP address blocked after repeated failures",
        Some(408) | Some(409) | Some(410) => "password expired or must be changed",
        Some(_) => "login refused",
        None => "login refused without an error code",
    };
    match code {
        Some(code) => SessionError::Authentication(format!("{} (code {})", reason, code)),
        None => SessionError::Authentication(reason.to_string()),
    }
}

impl WebApiSession {
    /// Log in and return a session bound to the returned sid
    pub async fn login(
        target: &NasTarget,
        credentials: &Credentials,
        options: &WebApiOptions,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("syno-trigger/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!options.verify_tls)
            .build()
            .map_err(|e| SessionError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = format!("{}/webapi", target.base_url());
        info!(
            url = %base_url,
            user = %credentials.username(),
            "logging in to DSM web API"
        );

        let mut login = ApiCall::new(AUTH_API, "login", AUTH_LOGIN_VERSION)
            .with_path(AUTH_PATH)
            .with_param("account", credentials.username().as_str())
            .with_param("passwd", credentials.password().as_str())
            .with_param("session", API_SESSION_NAME)
            .with_param("format", "sid");
        if let Some(otp) = &options.otp_code {
            login = login.with_param("otp_code", otp.as_str());
        }

        let response = post(&client, &base_url, &login, None)
            .await
            .map_err(|e| match e {
                SessionError::Invocation(message) => SessionError::Transport(message),
                other => other,
            })?;

        if !response.success {
            warn!(code = ?response.error_code, "DSM login refused");
            return Err(auth_error(response.error_code));
        }

        let sid = response
            .data
            .get("sid")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SessionError::Authentication("login reply did not include a session id".into())
            })?
            .to_string();

        info!(host = %target.host, "DSM login successful");
        Ok(Self {
            client,
            base_url,
            host: target.host.clone(),
            sid,
        })
    }
}

/// POST one call and parse the reply envelope
async fn post(
    client: &reqwest::Client,
    base_url: &str,
    call: &ApiCall,
    sid: Option<&str>,
) -> Result<ApiResponse, SessionError> {
    let url = format!("{}/{}", base_url, call.path);
    let version = call.version.to_string();

    let mut form: Vec<(&str, &str)> = vec![
        ("api", call.api.as_str()),
        ("version", version.as_str()),
        ("method", call.method.as_str()),
    ];
    form.extend(call.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    if let Some(sid) = sid {
        form.push(("_sid", sid));
    }

    debug!(url = %url, api = %call.api, method = %call.method, "POST");

    let response = client
        .post(&url)
        .form(&form)
        .send()
        .await
        .map_err(|e| SessionError::Transport(format!("Request to {} failed: {}", url, e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SessionError::Transport(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(SessionError::Invocation(format!(
            "HTTP {} from {}",
            status, call.path
        )));
    }

    ApiResponse::parse(&body)
}

#[async_trait::async_trait]
impl NasSession for WebApiSession {
    fn transport(&self) -> Transport {
        Transport::Api
    }

    fn host(&self) -> &str {
        &self.host
    }

    async fn call(&self, call: &ApiCall) -> Result<ApiResponse, SessionError> {
        post(&self.client, &self.base_url, call, Some(&self.sid)).await
    }

    async fn close(&self) -> Result<(), SessionError> {
        let logout = ApiCall::new(AUTH_API, "logout", 1)
            .with_path(AUTH_PATH)
            .with_param("session", API_SESSION_NAME);
        let response = post(&self.client, &self.base_url, &logout, Some(&self.sid)).await?;
        if !response.success {
            return Err(SessionError::Invocation(format!(
                "logout failed: {}",
                response.describe_error()
            )));
        }
        debug!(host = %self.host, "logged out");
        Ok(())
    }
}
