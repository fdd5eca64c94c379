//! Console rendering for run results
//!
//! Every function returns a `String` so the CLI decides where it goes and
//! tests can inspect it. Colors follow `colored`'s own terminal/NO_COLOR
//! detection.

use crate::core::{DiscoveryReport, RunSummary, TestCatalog, TriggerResult};
use crate::models::{NasTarget, Transport};
use crate::utils::SessionError;
use colored::Colorize;
use std::fmt::Write;

const RULE_WIDTH: usize = 60;

/// Longest output echoed per result line; the full text is in `--json`
const MAX_OUTPUT_CHARS: usize = 200;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

fn truncate(text: &str, max: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max {
        flattened
    } else {
        let cut: String = flattened.chars().take(max).collect();
        format!("{}...", cut)
    }
}

fn mark(success: bool) -> String {
    if success {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// `--list` output; needs no session
pub fn render_catalog(catalog: &TestCatalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Available notification tests:");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for test in catalog.tests() {
        let _ = writeln!(out, "  {:12} - {}", test.name, test.description);
        let _ = writeln!(
            out,
            "               API: {} ({} v{})",
            test.call.api, test.call.method, test.call.version
        );
    }
    out
}

pub fn render_banner(transport: Transport, target: &NasTarget, user: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Synology Notification Trigger ({})", transport);
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Host: {}", target);
    let _ = writeln!(out, "User: {}", user);
    if transport == Transport::Api {
        let _ = writeln!(out, "Secure: {}", target.secure);
    }
    let _ = write!(out, "{}", rule());
    out
}

/// One result line, e.g. `[PUSH] ✓ ok (120 ms)`
pub fn render_result(result: &TriggerResult) -> String {
    format!(
        "[{}] {} {} ({} ms)",
        result.name.to_uppercase(),
        mark(result.success),
        truncate(&result.output, MAX_OUTPUT_CHARS),
        result.duration_ms
    )
}

pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "  Tests run:  {}", summary.results.len());
    let _ = writeln!(out, "  Successful: {}", summary.succeeded());
    let _ = writeln!(out, "  Failed:     {}", summary.failed());
    let _ = write!(out, "\nCheck your webhook receiver for the captured alerts.");
    out
}

pub fn render_discovery(report: &DiscoveryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Notification-related APIs advertised by SYNO.API.Info:");
    match &report.listing_error {
        Some(error) => {
            let _ = writeln!(out, "  Could not enumerate APIs: {}", error);
        }
        None if report.advertised.is_empty() => {
            let _ = writeln!(out, "  (none matched)");
        }
        None => {
            for api in &report.advertised {
                let versions = match (api.min_version, api.max_version) {
                    (Some(min), Some(max)) => format!("v{}-{}", min, max),
                    _ => "v?".to_string(),
                };
                let _ = writeln!(
                    out,
                    "  - {} ({}, {})",
                    api.name,
                    versions,
                    api.path.as_deref().unwrap_or("?")
                );
            }
        }
    }

    let _ = writeln!(out, "\nCandidate endpoints:");
    for probe in &report.probes {
        let status = if probe.available {
            "available".to_string()
        } else {
            format!("not available: {}", truncate(&probe.detail, 80))
        };
        let _ = writeln!(
            out,
            "  {} {} {} v{} - {}",
            mark(probe.available),
            probe.api,
            probe.method,
            probe.version,
            status
        );
    }
    let _ = write!(
        out,
        "\n{} of {} candidates responded",
        report.available().count(),
        report.probes.len()
    );
    out
}

/// What to check after a failed login or connection
pub fn render_connection_hints(error: &SessionError) -> String {
    let hints: &[&str] = if error.is_auth() {
        &[
            "Username and password are correct",
            "The account has administrator privileges",
            "Two-factor accounts pass the current code with --otp",
        ]
    } else {
        &[
            "The host and port are reachable",
            "SSH is enabled (Control Panel > Terminal & SNMP) for --transport ssh",
            "--secure matches the DSM HTTP/HTTPS setting for --transport api",
        ]
    };
    let mut out = String::from("Please check:");
    for hint in hints {
        let _ = write!(out, "\n  - {}", hint);
    }
    out
}
