//! Command-line frontend for `syno-trigger`
//!
//! Parses flags, resolves exactly one [`Action`], and runs the
//! authenticate → dispatch → report → close cycle.

use crate::constants::DEFAULT_TEST_DELAY_SECS;
use crate::core::{resolve_target, Dispatcher, TestCatalog, TestDefinition};
use crate::models::{Credentials, NasTarget, SecureString, Transport, Username};
use crate::platform::{self, ConnectOptions, WebApiOptions};
use crate::report;
use crate::utils::{exit, ArgumentError, CatalogError, TriggerError};
use clap::{ArgAction, ArgGroup, Parser};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, warn};

const EXAMPLES: &str = "\
Examples:
    # Run all tests over the web API
    syno-trigger --host 192.168.1.100 --user admin

    # Use HTTPS (port 5001)
    syno-trigger --host 192.168.1.100 --user admin --secure

    # Run one test over SSH
    syno-trigger --transport ssh --host 192.168.1.100 --user admin --test push

    # Send a custom message (SSH only)
    syno-trigger --transport ssh --host 192.168.1.100 --user admin --custom \"Test alert\"

    # Probe for notification endpoints
    syno-trigger --host 192.168.1.100 --user admin --discover

    # List available tests
    syno-trigger --list";

#[derive(Parser, Debug)]
#[command(
    name = "syno-trigger",
    version,
    about = "Trigger Synology NAS notifications for webhook testing",
    after_help = EXAMPLES
)]
#[command(group(
    ArgGroup::new("action")
        .args(["test", "custom", "list", "discover", "config"])
        .multiple(false)
))]
pub struct Cli {
    #[arg(short = 'H', long, env = "SYNO_HOST", help = "NAS IP address or hostname (host:port accepted)")]
    pub host: Option<String>,

    #[arg(short, long, env = "SYNO_USER", help = "Account name (usually an administrator)")]
    pub user: Option<String>,

    #[arg(
        short,
        long,
        env = "SYNO_PASSWORD",
        hide_env_values = true,
        help = "Password (prompted if not provided)"
    )]
    pub password: Option<String>,

    #[arg(short, long, help = "Use HTTPS for the web API (default port 5001)")]
    pub secure: bool,

    #[arg(short = 'P', long, help = "Port (default: 22 for ssh, 5000 or 5001 for api)")]
    pub port: Option<u16>,

    #[arg(
        short = 'T',
        long,
        value_enum,
        env = "SYNO_TRANSPORT",
        default_value_t = Transport::Api,
        help = "How to reach the NAS"
    )]
    pub transport: Transport,

    #[arg(short, long, value_name = "NAME", help = "Run one test (or 'all')")]
    pub test: Option<String>,

    #[arg(short, long, value_name = "MESSAGE", help = "Send a custom notification message (ssh)")]
    pub custom: Option<String>,

    #[arg(short, long, help = "List available tests")]
    pub list: bool,

    #[arg(long, help = "Discover available notification APIs")]
    pub discover: bool,

    #[arg(long, help = "Show notification configuration")]
    pub config: bool,

    #[arg(
        short,
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_TEST_DELAY_SECS,
        help = "Delay between tests in seconds"
    )]
    pub delay: f64,

    #[arg(
        long,
        value_name = "ID",
        help = "Pin the webhook provider profile (default: every listed provider)"
    )]
    pub profile_id: Option<u32>,

    #[arg(long, value_name = "CODE", help = "Two-factor one-time code for web API login")]
    pub otp: Option<String>,

    #[arg(long, help = "Verify the NAS TLS certificate")]
    pub verify_tls: bool,

    #[arg(long, help = "Do not wrap SSH commands in sudo")]
    pub no_sudo: bool,

    #[arg(long, value_name = "FILE", env = "SYNO_TRIGGER_CATALOG", help = "Replacement test catalog (TOML)")]
    pub catalog: Option<PathBuf>,

    #[arg(long, help = "Output machine-readable JSON")]
    pub json: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v, -vv)")]
    pub verbose: u8,
}

/// What a single invocation does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List,
    Discover,
    ShowConfig,
    Custom(String),
    RunOne(String),
    RunAll,
}

impl Action {
    pub fn needs_session(&self) -> bool {
        !matches!(self, Action::List)
    }
}

impl Cli {
    /// Resolve the requested action
    pub fn action(&self) -> Action {
        if self.list {
            Action::List
        } else if self.discover {
            Action::Discover
        } else if self.config {
            Action::ShowConfig
        } else if let Some(message) = &self.custom {
            Action::Custom(message.clone())
        } else {
            match self.test.as_deref() {
                None => Action::RunAll,
                Some(name) if name.eq_ignore_ascii_case("all") => Action::RunAll,
                Some(name) => Action::RunOne(name.to_string()),
            }
        }
    }

    /// Check flag combinations clap cannot express
    pub fn validate(&self, action: &Action) -> Result<(), ArgumentError> {
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(ArgumentError(format!(
                "--delay must be a non-negative number of seconds, got {}",
                self.delay
            )));
        }

        if !action.needs_session() {
            return Ok(());
        }

        let missing: Vec<&str> = [
            ("--host", self.host.as_deref()),
            ("--user", self.user.as_deref()),
        ]
        .iter()
        .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
        .map(|(flag, _)| *flag)
        .collect();
        if !missing.is_empty() {
            return Err(ArgumentError(format!("{} required", missing.join(" and "))));
        }

        if matches!(action, Action::Custom(_)) && self.transport != Transport::Ssh {
            return Err(ArgumentError(
                "--custom needs --transport ssh (the web API has no custom message call)".into(),
            ));
        }

        if let Action::Custom(message) = action {
            if message.trim().is_empty() {
                return Err(ArgumentError("--custom message cannot be empty".into()));
            }
        }

        Ok(())
    }

    fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            use_sudo: !self.no_sudo,
            web: WebApiOptions {
                verify_tls: self.verify_tls,
                otp_code: self.otp.clone(),
            },
        }
    }
}

/// Built-in catalog, or the file given by `--catalog`
pub fn load_catalog(path: Option<&Path>) -> Result<TestCatalog, CatalogError> {
    match path {
        Some(path) => TestCatalog::from_file(path),
        None => TestCatalog::builtin(),
    }
}

fn obtain_password(
    cli: &Cli,
    target: &NasTarget,
    username: &Username,
) -> Result<SecureString, ArgumentError> {
    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password(format!(
            "Enter password for {}@{}: ",
            username, target.host
        ))
        .map_err(|e| ArgumentError(format!("could not read password: {}", e)))?,
    };
    if password.is_empty() {
        return Err(ArgumentError("password cannot be empty".into()));
    }
    Ok(SecureString::new(password))
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => error!(error = %e, "failed to serialize output"),
    }
}

#[derive(Serialize)]
struct CatalogEntry<'a> {
    name: &'a str,
    description: &'a str,
    api: &'a str,
    method: &'a str,
    version: u32,
}

fn print_catalog(catalog: &TestCatalog, json: bool) {
    if json {
        let entries: Vec<CatalogEntry<'_>> = catalog
            .tests()
            .iter()
            .map(|t| CatalogEntry {
                name: &t.name,
                description: &t.description,
                api: &t.call.api,
                method: &t.call.method,
                version: t.call.version,
            })
            .collect();
        print_json(&entries);
    } else {
        print!("{}", report::render_catalog(catalog));
    }
}

/// Run one invocation and return the process exit code
pub async fn run(cli: Cli) -> Result<u8, TriggerError> {
    let mut catalog = load_catalog(cli.catalog.as_deref())?;
    if let Some(profile_id) = cli.profile_id {
        catalog.override_param("profile_id", &profile_id.to_string());
    }

    let action = cli.action();
    cli.validate(&action)?;

    if action == Action::List {
        print_catalog(&catalog, cli.json);
        return Ok(exit::SUCCESS);
    }

    // Unknown test names fail before any network activity
    let selected: Option<&TestDefinition> = match &action {
        Action::RunOne(name) => Some(catalog.get(name)?),
        _ => None,
    };

    let host = cli.host.as_deref().unwrap_or_default();
    let user = cli.user.as_deref().unwrap_or_default();
    let target = resolve_target(host, cli.port, cli.secure, cli.transport)?;
    if cli.secure && cli.transport == Transport::Ssh {
        warn!("--secure only applies to the api transport; ignoring");
    }
    let username = Username::new(user)?;
    let password = obtain_password(&cli, &target, &username)?;
    let credentials = Credentials::new(username, password);

    if !cli.json {
        println!(
            "{}",
            report::render_banner(cli.transport, &target, credentials.username().as_str())
        );
    }

    let session = platform::connect(cli.transport, &target, &credentials, &cli.connect_options())
        .await
        .map_err(|e| {
            error!(host = %target.host, error = %e, "could not open session");
            e
        })?;

    let dispatcher =
        Dispatcher::new(session.as_ref()).with_delay(Duration::from_secs_f64(cli.delay));

    let code = match action {
        Action::List => exit::SUCCESS,
        Action::Discover => {
            let report = dispatcher.discover(catalog.discover_plan()).await;
            if cli.json {
                print_json(&report);
            } else {
                println!("{}", report::render_discovery(&report));
            }
            exit::SUCCESS
        }
        Action::ShowConfig => {
            let config = dispatcher.show_config(catalog.config_queries()).await;
            if !cli.json {
                println!("\nNotification Configuration:");
            }
            print_json(&config);
            exit::SUCCESS
        }
        Action::Custom(message) => {
            let result = dispatcher.send_custom(&message).await;
            if cli.json {
                print_json(&result);
            } else {
                println!("{}", report::render_result(&result));
            }
            if result.success {
                exit::SUCCESS
            } else {
                exit::TRIGGER_FAILED
            }
        }
        Action::RunOne(_) | Action::RunAll => {
            let tests = match selected {
                Some(test) => std::slice::from_ref(test),
                None => catalog.tests(),
            };
            let json = cli.json;
            let summary = dispatcher
                .run_all_reporting(tests, |result| {
                    if !json {
                        println!("{}", report::render_result(result));
                    }
                })
                .await;
            if json {
                print_json(&summary);
            } else {
                println!("{}", report::render_summary(&summary));
            }
            if summary.all_succeeded() {
                exit::SUCCESS
            } else {
                exit::TRIGGER_FAILED
            }
        }
    };

    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close session cleanly");
    }

    Ok(code)
}
