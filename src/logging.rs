//! `tracing` subscriber setup.
//!
//! While the table view is open the terminal belongs to the UI, so logs go to a file.
//! Headless exports log to stderr. `RUST_LOG` overrides the configured level.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default log file name inside the cache directory
pub const LOG_FILE: &str = "jtv.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Level,
    /// Log to this file instead of stderr
    pub log_file: Option<PathBuf>,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_file: None,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Build from the configured level name; `debug` forces the debug level.
    pub fn from_level_name(level: &str, debug: bool) -> Result<Self> {
        let level = if debug {
            Level::DEBUG
        } else {
            parse_level(level)?
        };
        Ok(Self {
            level,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_log_file(mut self, path: Option<PathBuf>) -> Self {
        // No colour escapes in files
        self.with_ansi = path.is_none();
        self.log_file = path;
        self
    }
}

pub fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| eyre!("Invalid log level: {}", level))
}

/// Install the global subscriber. Calling it a second time is an error.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = build_env_filter(config.level);
    let layer = fmt::layer()
        .with_ansi(config.with_ansi)
        .with_target(false);

    match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_writer(Mutex::new(file)))
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(layer.with_writer(io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

/// Filter at `level` for jtv, `warn` for dependencies, unless `RUST_LOG` is set.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,jtv={level}",
            level = level.as_str().to_lowercase()
        ))
    })
}
