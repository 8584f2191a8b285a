//! Tracing subscriber setup
//!
//! `RUST_LOG` wins; otherwise the configured level applies to the moodwave
//! crates. With `logging.file` set, output goes to that file (trimmed to
//! `max_file_bytes` first) instead of stderr.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodwave_common::config::LoggingConfig;

use crate::error::{Error, Result};

/// Filter directives for a configured level
pub fn default_directives(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    format!(
        "moodwave={level},moodwave_gen={level},moodwave_common={level}",
        level = level
    )
}

pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(&config.level)))
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let (file_layer, stderr_layer) = match &config.file {
        Some(path) => {
            trim_log_file(path, config.max_file_bytes)?;
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false);
            (Some(layer), None)
        }
        None => (None, Some(fmt::layer().with_writer(io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Tracing already initialized: {}", e)))?;

    Ok(())
}

/// Keep only the newest `max_bytes` of a log file, cut at a line start
///
/// A missing file is fine.
pub fn trim_log_file(path: &Path, max_bytes: u64) -> io::Result<()> {
    let len = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if len <= max_bytes {
        return Ok(());
    }

    let content = std::fs::read(path)?;
    let start = content.len().saturating_sub(max_bytes as usize);
    let tail = &content[start..];
    // Drop the partial first line unless the cut landed on a line start
    let tail = if start > 0 && content[start - 1] != b'\n' {
        match tail.iter().position(|&b| b == b'\n') {
            Some(newline) => &tail[newline + 1..],
            None => &[][..],
        }
    } else {
        tail
    };

    std::fs::write(path, tail)
}
