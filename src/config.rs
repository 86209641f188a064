use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paginator::{PaginationCursor, ParamNames, DEFAULT_LIMIT, DEFAULT_LIMIT_PARAM, DEFAULT_OFFSET_PARAM};
use crate::transport::DEFAULT_TIMEOUT_SECS;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub pagination: PaginationConfig,
    pub http: HttpConfig,
    pub export: ExportConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaginationConfig {
    /// Page size for new tabs
    pub default_limit: u64,
    pub limit_param: String,
    pub offset_param: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Endpoint that exchanges username/password for a bearer token
    pub auth_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for CSV exports from the TUI (current directory when unset)
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_column_width: u16,
    pub show_meta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.3".to_string(),
            pagination: PaginationConfig::default(),
            http: HttpConfig::default(),
            export: ExportConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            limit_param: DEFAULT_LIMIT_PARAM.to_string(),
            offset_param: DEFAULT_OFFSET_PARAM.to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auth_url: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_column_width: 40,
            show_meta: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_from(&ConfigManager::new(app_name)?)
    }

    /// Load configuration using the config file managed by `manager`
    pub fn load_from(manager: &ConfigManager) -> Result<Self> {
        let mut config = AppConfig::default();
        config.merge(Self::load_user_config(manager)?);
        config.validate()?;
        Ok(config)
    }

    /// Load user configuration from config.toml, defaults if there is none
    fn load_user_config(manager: &ConfigManager) -> Result<AppConfig> {
        let config_path = manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.pagination.merge(other.pagination);
        self.http.merge(other.http);
        self.export.merge(other.export);
        self.display.merge(other.display);
        self.logging.merge(other.logging);
        self.persistence.merge(other.persistence);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.3") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.3.x",
                self.version
            ));
        }

        if self.pagination.default_limit == 0 {
            return Err(eyre!("default_limit must be greater than 0"));
        }
        let limit_param = self.pagination.limit_param.trim();
        let offset_param = self.pagination.offset_param.trim();
        if limit_param.is_empty() || offset_param.is_empty() {
            return Err(eyre!("limit_param and offset_param must not be empty"));
        }
        if limit_param == offset_param {
            return Err(eyre!(
                "limit_param and offset_param must differ (both are '{}')",
                limit_param
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(eyre!("timeout_secs must be greater than 0"));
        }

        if self.display.max_column_width < 4 {
            return Err(eyre!("max_column_width must be at least 4"));
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(eyre!(
                    "Invalid logging level: {}. Must be one of error, warn, info, debug, trace",
                    self.logging.level
                ))
            }
        }

        Ok(())
    }

    /// Cursor for new tabs: configured page size and parameter names at offset 0
    pub fn default_cursor(&self) -> PaginationCursor {
        PaginationCursor::with_limit(self.pagination.default_limit).with_param_names(ParamNames {
            limit: self.pagination.limit_param.trim().to_string(),
            offset: self.pagination.offset_param.trim().to_string(),
        })
    }
}

impl PaginationConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PaginationConfig::default();
        if other.default_limit != default.default_limit {
            self.default_limit = other.default_limit;
        }
        if other.limit_param != default.limit_param {
            self.limit_param = other.limit_param;
        }
        if other.offset_param != default.offset_param {
            self.offset_param = other.offset_param;
        }
    }
}

impl HttpConfig {
    pub fn merge(&mut self, other: Self) {
        let default = HttpConfig::default();
        if other.timeout_secs != default.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.auth_url.is_some() {
            self.auth_url = other.auth_url;
        }
    }
}

impl ExportConfig {
    pub fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
    }
}

impl DisplayConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DisplayConfig::default();
        if other.max_column_width != default.max_column_width {
            self.max_column_width = other.max_column_width;
        }
        if other.show_meta != default.show_meta {
            self.show_meta = other.show_meta;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        let default = LoggingConfig::default();
        if other.level != default.level {
            self.level = other.level;
        }
        if other.file.is_some() {
            self.file = other.file;
        }
    }
}

impl PersistenceConfig {
    pub fn merge(&mut self, other: Self) {
        let default = PersistenceConfig::default();
        if other.enabled != default.enabled {
            self.enabled = other.enabled;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
