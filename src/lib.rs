use std::path::PathBuf;
use std::time::Duration;

use crate::paginator::{LoadMode, PaginationCursor, ParamNames};
use crate::transport::{Credentials, DEFAULT_TIMEOUT_SECS};

pub mod app;
pub mod columns;
pub mod config;
pub mod error;
pub mod export;
pub mod flatten;
pub mod logging;
pub mod paginator;
pub mod persistence;
pub mod sort;
pub mod table;
pub mod tabs;
pub mod transport;
pub mod widgets;

pub use app::{App, AppEvent, InputMode};
pub use config::{AppConfig, ConfigManager};
pub use error::{AuthError, ExportError, LoadError, StructuralError};
pub use jtv_cli::Args;
pub use paginator::{PageFetcher, Paginator};
pub use persistence::{FileStatePort, SessionSnapshot, StatePort};
pub use table::{load, LoadStatus, LoadSummary, TableEvent, TableState};
pub use tabs::TabCollection;
pub use transport::HttpFetcher;

/// Application name used for config and cache directories
pub const APP_NAME: &str = "jtv";

/// Settings for one run, resolved from command line and config
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub url: Option<String>,
    /// Cursor for new tabs (and for `url`): limit and parameter names, offset 0
    pub cursor: PaginationCursor,
    /// Starting offset for `url`
    pub offset: Option<u64>,
    pub load_mode: LoadMode,
    pub token: Option<String>,
    pub auth_url: Option<String>,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    /// Headless export target ("-" for stdout)
    pub export: Option<PathBuf>,
    /// Where the table view writes CSV exports
    pub export_dir: PathBuf,
    pub max_column_width: u16,
    pub show_meta: bool,
    pub persist: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            url: None,
            cursor: PaginationCursor::default(),
            offset: None,
            load_mode: LoadMode::Single,
            token: None,
            auth_url: None,
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            export: None,
            export_dir: PathBuf::from("."),
            max_column_width: 40,
            show_meta: true,
            persist: true,
        }
    }
}

impl RunOptions {
    /// Create RunOptions from CLI args and config, with CLI args taking precedence
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> Self {
        let mut cursor = config.default_cursor();
        if let Some(limit) = args.limit {
            cursor = PaginationCursor {
                limit: limit.max(1),
                ..cursor
            };
        }
        let names = ParamNames {
            limit: args
                .limit_param
                .clone()
                .unwrap_or(cursor.param_names.limit.clone()),
            offset: args
                .offset_param
                .clone()
                .unwrap_or(cursor.param_names.offset.clone()),
        };
        cursor = cursor.with_param_names(names);

        let credentials = match (&args.username, &args.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Self {
            url: args
                .url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            cursor,
            offset: args.offset,
            load_mode: if args.all {
                LoadMode::All
            } else {
                LoadMode::Single
            },
            token: args.token.clone().filter(|t| !t.is_empty()),
            auth_url: args.auth_url.clone().or(config.http.auth_url.clone()),
            credentials,
            timeout: Duration::from_secs(args.timeout.unwrap_or(config.http.timeout_secs).max(1)),
            export: args.export.clone(),
            export_dir: config
                .export
                .directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            max_column_width: config.display.max_column_width,
            show_meta: config.display.show_meta,
            persist: config.persistence.enabled && !args.no_persist,
        }
    }
}

impl From<&Args> for RunOptions {
    fn from(args: &Args) -> Self {
        // Use default config if creating from args alone
        let config = AppConfig::default();
        Self::from_args_and_config(args, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let mut config = AppConfig::default();
        config.pagination.default_limit = 50;
        config.pagination.offset_param = "skip".to_string();
        config.http.timeout_secs = 5;
        config.http.auth_url = Some("http://h/login".to_string());

        let args = Args {
            url: Some(" http://h/items ".to_string()),
            limit: Some(25),
            limit_param: Some("take".to_string()),
            timeout: Some(9),
            all: true,
            ..Args::default()
        };
        let opts = RunOptions::from_args_and_config(&args, &config);
        assert_eq!(opts.url.as_deref(), Some("http://h/items"));
        assert_eq!(opts.cursor.limit, 25);
        assert_eq!(opts.cursor.offset, 0);
        assert_eq!(opts.cursor.param_names.limit, "take");
        assert_eq!(opts.cursor.param_names.offset, "skip");
        assert_eq!(opts.timeout, Duration::from_secs(9));
        assert_eq!(opts.load_mode, LoadMode::All);
        assert_eq!(opts.auth_url.as_deref(), Some("http://h/login"));
    }

    #[test]
    fn config_values_used_without_args() {
        let mut config = AppConfig::default();
        config.pagination.default_limit = 50;
        config.persistence.enabled = false;
        let opts = RunOptions::from_args_and_config(&Args::default(), &config);
        assert_eq!(opts.cursor.limit, 50);
        assert_eq!(opts.load_mode, LoadMode::Single);
        assert!(!opts.persist);
        assert!(opts.credentials.is_none());
    }

    #[test]
    fn credentials_need_both_parts() {
        let args = Args {
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            no_persist: true,
            ..Args::default()
        };
        let opts: RunOptions = (&args).into();
        assert_eq!(opts.credentials.map(|c| c.username), Some("u".to_string()));
        assert!(!opts.persist);
    }
}
