//! Logging setup
//!
//! Logs go to stderr so they never mix with the report on stdout. When
//! `SYNO_TRIGGER_LOG_FILE` is set, the same events are appended to that file
//! without ANSI colors.

use crate::constants::{LOG_FILE_ENV, MAX_LOG_BYTES};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive for a `-v` count
fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "synotrigger=info,syno_trigger=info,syno_mock_alerts=info",
        2 => "synotrigger=debug,syno_trigger=debug,syno_mock_alerts=debug",
        _ => "trace",
    }
}

fn rotate_if_needed(path: &Path) {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > MAX_LOG_BYTES {
            let backup = path.with_extension("log.bak");
            let _ = fs::remove_file(&backup);
            let _ = fs::rename(path, &backup);
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the verbosity count. Safe to call more than once;
/// later calls are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = std::env::var_os(LOG_FILE_ENV)
        .map(PathBuf::from)
        .and_then(|path| {
            rotate_if_needed(&path);
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .ok()
        })
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}
