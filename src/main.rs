//! `syno-trigger` - make a Synology NAS emit test notifications

use clap::Parser;
use std::process::ExitCode;
use synotrigger::cli::{self, Cli};
use synotrigger::utils::TriggerError;
use synotrigger::{logger, report};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli::run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let TriggerError::Session(session_error) = &e {
                eprintln!("\n{}", report::render_connection_hints(session_error));
            }
            ExitCode::from(e.exit_code())
        }
    }
}
