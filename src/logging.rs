//! File logging for `tracing` events.
//!
//! The terminal belongs to the TUI, so events are appended to
//! `~/.decomp/decomp.log`. `DECOMP_LOG` overrides the configured filter.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

use crate::config::Config;

/// Environment variable holding a filter that wins over `log-filter`.
pub const FILTER_ENV: &str = "DECOMP_LOG";

const LOG_FILE: &str = "decomp.log";

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to open log file {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("invalid log filter {filter:?}: {source}")]
    Filter { filter: String, source: ParseError },

    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Installs the global subscriber. Returns the log file path.
pub fn init(config: &Config) -> Result<PathBuf, LogError> {
    let dir = Config::dir().ok_or(LogError::NoHome)?;
    let env = std::env::var(FILTER_ENV).ok();
    let filter = resolve_filter(env.as_deref(), &config.log_filter)?;
    let (path, file) = open_log(&dir)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| LogError::Install(e.to_string()))?;

    Ok(path)
}

/// A non-blank environment filter, otherwise the configured one.
fn resolve_filter(env: Option<&str>, configured: &str) -> Result<EnvFilter, LogError> {
    let directives = env
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(configured);
    EnvFilter::try_new(directives).map_err(|source| LogError::Filter {
        filter: directives.to_string(),
        source,
    })
}

fn open_log(dir: &Path) -> Result<(PathBuf, File), LogError> {
    let path = dir.join(LOG_FILE);
    let open = || {
        fs::create_dir_all(dir)?;
        OpenOptions::new().create(true).append(true).open(&path)
    };
    match open() {
        Ok(file) => Ok((path, file)),
        Err(source) => Err(LogError::Open { path, source }),
    }
}
