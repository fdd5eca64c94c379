//! Mock alert replay
//!
//! Loads captured (or hand-written) webhook payloads from a directory of
//! `*.json` files and posts them to a webhook URL, so a workflow can be
//! exercised without a NAS. Each file looks like:
//!
//! ```json
//! {
//!   "level": "ERROR",
//!   "category": "Storage",
//!   "headers": { "content-type": "application/json" },
//!   "body": { "text": "Volume 1 on NAS01 has entered degraded mode." }
//! }
//! ```
//!
//! Only `body` is sent; `level` and `category` drive filtering.

use crate::constants::WEBHOOK_TIMEOUT_SECS;
use crate::core::TriggerResult;
use crate::utils::MockAlertError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Severity carried by a mock alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
#[value(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warn => "WARN",
            AlertLevel::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockAlert {
    /// File stem, filled in by the loader
    #[serde(skip)]
    pub name: String,
    pub level: AlertLevel,
    #[serde(default = "unknown_category")]
    pub category: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub body: Value,
}

fn unknown_category() -> String {
    "Unknown".to_string()
}

/// Load every `*.json` file in `dir`, keyed (and sorted) by file stem
pub fn load_mock_alerts(dir: &Path) -> Result<BTreeMap<String, MockAlert>, MockAlertError> {
    let io_err = |source| MockAlertError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut alerts = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        let text = std::fs::read_to_string(&path).map_err(|source| MockAlertError::Io {
            path: path.clone(),
            source,
        })?;
        let mut alert: MockAlert =
            serde_json::from_str(&text).map_err(|source| MockAlertError::Parse {
                path: path.clone(),
                source,
            })?;
        alert.name = stem.to_string();
        alerts.insert(alert.name.clone(), alert);
    }

    if alerts.is_empty() {
        return Err(MockAlertError::Empty(dir.to_path_buf()));
    }
    Ok(alerts)
}

/// Filters combined with AND; `None` matches everything
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub name: Option<String>,
    /// Compared case-insensitively
    pub category: Option<String>,
    pub level: Option<AlertLevel>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &MockAlert) -> bool {
        if let Some(name) = &self.name {
            if &alert.name != name {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !alert.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(level) = self.level {
            if alert.level != level {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, alerts: &'a BTreeMap<String, MockAlert>) -> Vec<&'a MockAlert> {
        alerts.values().filter(|a| self.matches(a)).collect()
    }
}

/// Alerts grouped by category, both levels sorted
pub fn group_by_category(alerts: &BTreeMap<String, MockAlert>) -> BTreeMap<&str, Vec<&MockAlert>> {
    let mut groups: BTreeMap<&str, Vec<&MockAlert>> = BTreeMap::new();
    for alert in alerts.values() {
        groups.entry(alert.category.as_str()).or_default().push(alert);
    }
    groups
}

/// HTTP statuses a webhook endpoint uses to acknowledge delivery
fn is_delivered(status: u16) -> bool {
    matches!(status, 200 | 201 | 202 | 204)
}

/// Posts mock alert bodies to one webhook
pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(format!("syno-trigger/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub async fn send(&self, alert: &MockAlert) -> TriggerResult {
        let started = Instant::now();
        debug!(alert = %alert.name, url = %self.url, "posting mock alert");

        let (success, output, raw) =
            match self.client.post(&self.url).json(&alert.body).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let raw = response.text().await.unwrap_or_default();
                    (is_delivered(status), format!("HTTP {}", status), raw)
                }
                Err(e) => (false, e.to_string(), String::new()),
            };
        if !success {
            warn!(alert = %alert.name, error = %output, "mock alert not delivered");
        }

        TriggerResult {
            name: alert.name.clone(),
            success,
            output,
            raw,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Send each alert in order, pausing between sends (not after the last)
    pub async fn send_all<F>(&self, alerts: &[&MockAlert], delay: Duration, mut on_result: F) -> Vec<TriggerResult>
    where
        F: FnMut(&MockAlert, &TriggerResult),
    {
        let mut results = Vec::with_capacity(alerts.len());
        for (index, alert) in alerts.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = self.send(alert).await;
            on_result(alert, &result);
            results.push(result);
        }
        results
    }
}

/// First `max` characters of the payload, for dry runs
pub fn payload_preview(alert: &MockAlert, max: usize) -> String {
    let text = alert.body.to_string();
    if text.chars().count() <= max {
        text
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}
