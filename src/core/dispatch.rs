//! Command dispatcher
//!
//! Runs catalog entries and the auxiliary actions (custom message, discovery,
//! configuration dump) against an authenticated [`NasSession`].
//!
//! Nothing here returns an error: a failed invocation becomes a failed
//! [`TriggerResult`] (or a "not available" probe) and the run moves on.

use super::catalog::{ConfigQuery, DiscoverPlan, TestDefinition};
use super::session::{ApiCall, NasSession, TriggerResult};
use crate::constants::{INFO_API, INFO_PATH};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name reported for `--custom` results
pub const CUSTOM_TEST_NAME: &str = "custom";

/// Results of one run, in dispatch order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub results: Vec<TriggerResult>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// An API advertised by `SYNO.API.Info`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvertisedApi {
    pub name: String,
    pub path: Option<String>,
    pub min_version: Option<u64>,
    pub max_version: Option<u64>,
}

/// Outcome of probing one candidate endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeOutcome {
    pub api: String,
    pub method: String,
    pub version: u32,
    pub available: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryReport {
    /// Keyword matches from `SYNO.API.Info`, when the listing worked
    pub advertised: Vec<AdvertisedApi>,
    /// Why the listing failed, if it did
    pub listing_error: Option<String>,
    pub probes: Vec<ProbeOutcome>,
}

impl DiscoveryReport {
    pub fn available(&self) -> impl Iterator<Item = &ProbeOutcome> {
        self.probes.iter().filter(|p| p.available)
    }
}

/// Values of `param` across the `data.<items>` array, in listed order
fn listed_values(data: &Value, items: &str, param: &str) -> Vec<String> {
    let Some(list) = data.get(items).and_then(Value::as_array) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|item| match item.get(param)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn summarize_data(data: &Value) -> String {
    match data {
        Value::Null => "ok".to_string(),
        other => other.to_string(),
    }
}

/// Drives trigger actions over one session, one at a time
pub struct Dispatcher<'a> {
    session: &'a dyn NasSession,
    delay: Duration,
}

impl<'a> Dispatcher<'a> {
    pub fn new(session: &'a dyn NasSession) -> Self {
        Self {
            session,
            delay: Duration::ZERO,
        }
    }

    /// Pause inserted between consecutive tests in [`Dispatcher::run_all`]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Execute one test definition
    pub async fn dispatch(&self, test: &TestDefinition) -> TriggerResult {
        let started = Instant::now();
        debug!(
            test = %test.name,
            api = %test.call.api,
            method = %test.call.method,
            version = test.call.version,
            "dispatching"
        );

        let (success, output, raw) = match self.session.call(&test.call).await {
            Ok(response) if response.success => {
                (true, summarize_data(&response.data), response.raw)
            }
            Ok(response) => (false, response.describe_error(), response.raw),
            Err(e) => (false, e.to_string(), String::new()),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        if success {
            info!(test = %test.name, duration_ms, "trigger succeeded");
        } else {
            warn!(test = %test.name, duration_ms, error = %output, "trigger failed");
        }

        TriggerResult {
            name: test.name.clone(),
            success,
            output,
            raw,
            duration_ms,
        }
    }

    /// The concrete invocations for `test`
    ///
    /// A test with a [`FanOut`](super::catalog::FanOut) becomes one
    /// invocation per listed item, named `<test>:<value>`. When the list
    /// call fails or lists nothing, the test runs once with its catalog
    /// parameters.
    pub async fn expand(&self, test: &TestDefinition) -> Vec<TestDefinition> {
        let Some(fan_out) = &test.fan_out else {
            return vec![test.clone()];
        };

        let values = match self.session.call(&fan_out.source).await {
            Ok(response) if response.success => {
                listed_values(&response.data, &fan_out.items, &fan_out.param)
            }
            Ok(response) => {
                warn!(test = %test.name, error = %response.describe_error(), "listing failed");
                Vec::new()
            }
            Err(e) => {
                warn!(test = %test.name, error = %e, "listing failed");
                Vec::new()
            }
        };

        if values.is_empty() {
            debug!(test = %test.name, "nothing listed, using catalog parameters");
            return vec![test.clone()];
        }
        info!(test = %test.name, count = values.len(), param = %fan_out.param, "expanding");

        values
            .into_iter()
            .map(|value| TestDefinition {
                name: format!("{}:{}", test.name, value),
                description: test.description.clone(),
                call: test.call.clone().with_param(fan_out.param.clone(), value),
                fan_out: None,
            })
            .collect()
    }

    /// Run one test, which may expand into several invocations
    pub async fn run_one(&self, test: &TestDefinition) -> RunSummary {
        self.run_all(std::slice::from_ref(test)).await
    }

    /// Dispatch every test once, in order, continuing past failures
    pub async fn run_all(&self, tests: &[TestDefinition]) -> RunSummary {
        self.run_all_reporting(tests, |_| {}).await
    }

    /// Like [`Dispatcher::run_all`], calling `on_result` as each test finishes
    pub async fn run_all_reporting<F>(&self, tests: &[TestDefinition], mut on_result: F) -> RunSummary
    where
        F: FnMut(&TriggerResult),
    {
        let mut summary = RunSummary::default();
        for test in tests {
            for invocation in self.expand(test).await {
                if !summary.results.is_empty() && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let result = self.dispatch(&invocation).await;
                on_result(&result);
                summary.results.push(result);
            }
        }
        summary
    }

    /// Post a DSM desktop notification with a custom message (SSH only)
    ///
    /// Tries `synodsmnotify` first and falls back to `synonotify` when it fails.
    pub async fn send_custom(&self, message: &str) -> TriggerResult {
        let started = Instant::now();
        let primary = format!(
            "synodsmnotify -c {} {} {}",
            shell_escape::escape("@administrators".into()),
            shell_escape::escape("Test Alert".into()),
            shell_escape::escape(message.into())
        );

        let primary_error = match self.session.exec_shell(&primary).await {
            Ok(output) if output.success() => {
                return self.custom_result(
                    true,
                    "sent via synodsmnotify".to_string(),
                    output.stdout,
                    started,
                );
            }
            Ok(output) => output.message(),
            Err(e) => e.to_string(),
        };
        warn!(error = %primary_error, "synodsmnotify failed, trying synonotify");

        let payload = json!({ "title": "Test", "message": message }).to_string();
        let fallback = format!(
            "synonotify PKGHasUpgrade {}",
            shell_escape::escape(payload.into())
        );

        match self.session.exec_shell(&fallback).await {
            Ok(output) if output.success() => self.custom_result(
                true,
                "sent via synonotify fallback".to_string(),
                output.stdout,
                started,
            ),
            Ok(output) => {
                let message = output.message();
                let detail = if message.is_empty() {
                    format!("exit status {}", output.exit_code)
                } else {
                    message
                };
                self.custom_result(
                    false,
                    format!("synodsmnotify: {}; synonotify: {}", primary_error, detail),
                    output.stdout,
                    started,
                )
            }
            Err(e) => self.custom_result(
                false,
                format!("synodsmnotify: {}; synonotify: {}", primary_error, e),
                String::new(),
                started,
            ),
        }
    }

    fn custom_result(
        &self,
        success: bool,
        output: String,
        raw: String,
        started: Instant,
    ) -> TriggerResult {
        TriggerResult {
            name: CUSTOM_TEST_NAME.to_string(),
            success,
            output,
            raw,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// List advertised notification APIs, then probe every candidate endpoint
    pub async fn discover(&self, plan: &DiscoverPlan) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let listing = ApiCall::new(INFO_API, "query", 1)
            .with_path(INFO_PATH)
            .with_param("query", "all");
        match self.session.call(&listing).await {
            Ok(response) if response.success => {
                report.advertised = matching_apis(&response.data, &plan.keywords);
            }
            Ok(response) => report.listing_error = Some(response.describe_error()),
            Err(e) => report.listing_error = Some(e.to_string()),
        }
        if let Some(error) = &report.listing_error {
            warn!(error = %error, "could not enumerate APIs");
        }

        for candidate in &plan.candidates {
            let (available, detail) = match self.session.call(candidate).await {
                Ok(response) if response.success => (true, "responded".to_string()),
                Ok(response) => (false, response.describe_error()),
                Err(e) => (false, e.to_string()),
            };
            debug!(api = %candidate.api, available, "probed candidate");
            report.probes.push(ProbeOutcome {
                api: candidate.api.clone(),
                method: candidate.method.clone(),
                version: candidate.version,
                available,
                detail,
            });
        }

        report
    }

    /// Run every configuration query and collect the replies by name
    pub async fn show_config(&self, queries: &[ConfigQuery]) -> Value {
        let mut config = Map::new();
        for query in queries {
            let entry = match self.session.call(&query.call).await {
                Ok(response) if response.success => response.data,
                Ok(response) => json!({ "error": response.describe_error() }),
                Err(e) => json!({ "error": e.to_string() }),
            };
            config.insert(query.name.clone(), entry);
        }
        Value::Object(config)
    }
}

/// Pick APIs whose lowercase name contains any keyword, sorted by name
fn matching_apis(data: &Value, keywords: &[String]) -> Vec<AdvertisedApi> {
    let Some(apis) = data.as_object() else {
        return Vec::new();
    };

    let mut matches: Vec<AdvertisedApi> = apis
        .iter()
        .filter(|(name, _)| {
            let lower = name.to_lowercase();
            keywords.iter().any(|k| lower.contains(k.as_str()))
        })
        .map(|(name, info)| AdvertisedApi {
            name: name.clone(),
            path: info.get("path").and_then(Value::as_str).map(str::to_string),
            min_version: info.get("minVersion").and_then(Value::as_u64),
            max_version: info.get("maxVersion").and_then(Value::as_u64),
        })
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));
    matches
}
