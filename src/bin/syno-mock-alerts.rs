//! `syno-mock-alerts` - replay saved webhook payloads without a NAS

use clap::{ArgAction, Parser};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use synotrigger::constants::DEFAULT_MOCK_DELAY_SECS;
use synotrigger::logger;
use synotrigger::mock_alerts::{
    group_by_category, load_mock_alerts, payload_preview, AlertFilter, AlertLevel, WebhookSender,
};
use synotrigger::report;
use synotrigger::utils::exit;

/// Characters of payload shown per alert in `--dry-run`
const PREVIEW_CHARS: usize = 80;

#[derive(Parser, Debug)]
#[command(
    name = "syno-mock-alerts",
    version,
    about = "Send mock Synology alerts to a webhook for testing"
)]
struct Args {
    #[arg(short, long, env = "SYNO_MOCK_WEBHOOK", help = "Webhook URL to post alerts to")]
    webhook: Option<String>,

    #[arg(long, value_name = "DIR", default_value = "mock_alerts", help = "Directory of *.json alerts")]
    dir: PathBuf,

    #[arg(short = 't', long = "type", value_name = "NAME", help = "Send only this alert")]
    name: Option<String>,

    #[arg(short, long, help = "Send only alerts in this category")]
    category: Option<String>,

    #[arg(short, long, value_enum, help = "Send only alerts of this level")]
    level: Option<AlertLevel>,

    #[arg(
        short,
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_MOCK_DELAY_SECS,
        help = "Delay between alerts in seconds"
    )]
    delay: f64,

    #[arg(long, help = "List available alerts and exit")]
    list: bool,

    #[arg(long, help = "Show what would be sent without sending")]
    dry_run: bool,

    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v, -vv)")]
    verbose: u8,
}


#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(args.verbose);

    if !args.delay.is_finite() || args.delay < 0.0 {
        eprintln!("Error: --delay must be a non-negative number of seconds");
        return ExitCode::from(exit::USAGE);
    }

    let alerts = match load_mock_alerts(&args.dir) {
        Ok(alerts) => alerts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(exit::CATALOG);
        }
    };

    if args.list {
        println!("Available mock alerts:");
        for (category, members) in group_by_category(&alerts) {
            println!("\n  {}:", category);
            for alert in members {
                println!("    {:28} [{}]", alert.name, alert.level);
            }
        }
        println!("\nTotal: {} alerts", alerts.len());
        return ExitCode::from(exit::SUCCESS);
    }

    let filter = AlertFilter {
        name: args.name.clone(),
        category: args.category.clone(),
        level: args.level,
    };
    let selected = filter.apply(&alerts);
    if selected.is_empty() {
        eprintln!("Error: no alerts match the given filters");
        return ExitCode::from(exit::USAGE);
    }

    if args.dry_run {
        println!("Dry run: {} alerts would be sent", selected.len());
        for alert in &selected {
            println!(
                "  [{}] {} ({}): {}",
                alert.level,
                alert.name,
                alert.category,
                payload_preview(alert, PREVIEW_CHARS)
            );
        }
        return ExitCode::from(exit::SUCCESS);
    }

    let Some(webhook) = args.webhook.as_deref().filter(|w| !w.trim().is_empty()) else {
        eprintln!("Error: --webhook (or SYNO_MOCK_WEBHOOK) is required to send alerts");
        return ExitCode::from(exit::USAGE);
    };

    let sender = match WebhookSender::new(webhook) {
        Ok(sender) => sender,
        Err(e) => {
            eprintln!("Error: could not build HTTP client: {}", e);
            return ExitCode::from(exit::AUTH);
        }
    };

    println!("Sending {} mock alerts to {}", selected.len(), webhook);
    let results = sender
        .send_all(&selected, Duration::from_secs_f64(args.delay), |alert, result| {
            println!("{} {}", format!("[{}]", alert.level).bold(), report::render_result(result));
        })
        .await;

    let failed = results.iter().filter(|r| !r.success).count();
    println!(
        "\nSent {} of {} alerts ({} failed)",
        results.len() - failed,
        results.len(),
        failed
    );

    if failed == 0 {
        ExitCode::from(exit::SUCCESS)
    } else {
        ExitCode::from(exit::TRIGGER_FAILED)
    }
}
