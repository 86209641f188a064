//! Shared CLI definitions for jtv.
//!
//! Used by the main application and by the build script (manpage) and
//! gen_docs binary (command-line-options markdown).

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Command-line arguments for jtv
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "jtv",
    version,
    about = "JSON Tables Viewer: browse paginated JSON APIs in the terminal"
)]
pub struct Args {
    /// Endpoint URL for the first tab (e.g. http://localhost/api/items).
    /// Required with --export.
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Page size sent in the limit parameter (default: 100)
    #[arg(long = "limit", value_name = "N")]
    pub limit: Option<u64>,

    /// Offset of the first page to request (default: 0)
    #[arg(long = "offset", value_name = "N")]
    pub offset: Option<u64>,

    /// Name of the query parameter carrying the page size (default: limit)
    #[arg(long = "limit-param", value_name = "NAME")]
    pub limit_param: Option<String>,

    /// Name of the query parameter carrying the offset (default: offset)
    #[arg(long = "offset-param", value_name = "NAME")]
    pub offset_param: Option<String>,

    /// Keep requesting pages until the API returns an empty page
    #[arg(long = "all", action)]
    pub all: bool,

    /// Bearer token sent in the Authorization header
    #[arg(long = "token", value_name = "TOKEN", conflicts_with = "username")]
    pub token: Option<String>,

    /// Authentication endpoint used to obtain a token (overrides config)
    #[arg(long = "auth-url", value_name = "URL")]
    pub auth_url: Option<String>,

    /// Username for the authentication endpoint
    #[arg(long = "username", value_name = "USER", requires = "password")]
    pub username: Option<String>,

    /// Password for the authentication endpoint
    #[arg(long = "password", value_name = "PASSWORD", requires = "username")]
    pub password: Option<String>,

    /// Load without the terminal UI and write visible columns as CSV to PATH ("-" for stdout)
    #[arg(long = "export", value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// HTTP timeout in seconds for each request (overrides config)
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write logs to this file (default in TUI mode: cache directory)
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not restore or save the tab layout
    #[arg(long = "no-persist", action)]
    pub no_persist: bool,

    /// Remove the saved tab layout and exit
    #[arg(long = "clear-state", action)]
    pub clear_state: bool,

    /// Generate default configuration file at ~/.config/jtv/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

impl Args {
    /// True when the run should skip the TUI and export directly.
    pub fn is_headless(&self) -> bool {
        self.export.is_some()
    }
}

/// Escape `|` and newlines for use in markdown table cells.
fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\n', '\r'], " ")
}

/// Render command-line options as markdown.
pub fn render_options_markdown() -> String {
    let mut cmd = Args::command();
    cmd.build();

    let mut out = String::from("# Command Line Options\n\n");

    out.push_str("## Usage\n\n```\n");
    let usage = cmd.render_usage();
    out.push_str(&usage.to_string());
    out.push_str("\n```\n\n");

    out.push_str("## Options\n\n");
    out.push_str("| Option | Description |\n");
    out.push_str("|--------|-------------|\n");

    for arg in cmd.get_arguments() {
        let id = arg.get_id().as_ref().to_string();
        if id == "help" || id == "version" {
            continue;
        }

        let placeholder: String = arg
            .get_value_names()
            .map(|names| {
                names
                    .iter()
                    .map(|n: &clap::builder::Str| format!("<{}>", n.as_ref() as &str))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        let option_str = if arg.is_positional() {
            format!("[{placeholder}]")
        } else {
            let mut parts = Vec::new();
            if let Some(s) = arg.get_short() {
                parts.push(format!("-{s}"));
            }
            if let Some(l) = arg.get_long() {
                parts.push(format!("--{l}"));
            }
            let op = parts.join(", ");
            if arg.get_action().takes_values() && !placeholder.is_empty() {
                format!("{op} {placeholder}")
            } else {
                op
            }
        };

        let help = arg
            .get_help()
            .map(|h| escape_table_cell(&h.to_string()))
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!("| `{option_str}` | {help} |\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_verify() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_headless_export() {
        let args = Args::parse_from([
            "jtv",
            "http://localhost/api/items",
            "--all",
            "--limit",
            "50",
            "--export",
            "-",
        ]);
        assert_eq!(args.url.as_deref(), Some("http://localhost/api/items"));
        assert!(args.all);
        assert_eq!(args.limit, Some(50));
        assert!(args.is_headless());
    }

    #[test]
    fn test_credentials_require_each_other() {
        let result = Args::try_parse_from(["jtv", "--username", "alice"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_force_requires_generate_config() {
        assert!(Args::try_parse_from(["jtv", "--force"]).is_err());
        assert!(Args::try_parse_from(["jtv", "--generate-config", "--force"]).is_ok());
    }

    #[test]
    fn test_render_options_markdown_lists_options() {
        let md = render_options_markdown();
        assert!(md.contains("--limit-param"));
        assert!(md.contains("--export"));
    }
}
