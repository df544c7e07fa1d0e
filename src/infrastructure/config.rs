//! Configuration infrastructure
//!
//! Every run parameter is a config-time value. Values are layered:
//! 1. Built-in defaults (the `defaults` module)
//! 2. An optional configuration file (TOML/JSON/YAML, picked by extension)
//! 3. Environment variables, e.g. `PMD_HARVEST__CATALOG__RANGE_END=151`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write configuration file: {0}")]
    Write(#[from] std::io::Error),
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub io: IoConfig,
    pub catalog: CatalogConfig,
    pub harvest: HarvestConfig,
    pub browser: BrowserConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
}

/// Input/output tables and their delimiters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,

    /// Field delimiter of the table itself (single ASCII character)
    pub field_delimiter: String,

    /// Separator inside list-valued cells (single character)
    pub list_separator: String,
}

/// Which catalog entries get harvested
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub range_start: u32,
    pub range_end: u32,

    /// Flag appended for variations without a stored flag
    pub default_minimal_flag: String,
}

/// Scrape loop timing and session cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Recreate the browser session after this many entries
    pub restart_after: u32,

    pub page_ready_timeout_ms: u64,
    pub control_timeout_ms: u64,
    pub download_timeout_ms: u64,

    /// How often bounded waits re-check the page
    pub poll_interval_ms: u64,

    pub page_settle_ms: u64,
    pub control_settle_ms: u64,
    pub selection_settle_ms: u64,
    pub entry_cooldown_ms: u64,
    pub restart_cooldown_ms: u64,
}

/// WebDriver endpoint and Chrome launch arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub chrome_args: Vec<String>,
    pub chrome_binary: Option<String>,
}

/// Target site URL and the selectors of its variation UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Entry pages live at `<base_url>#/<padded id>`
    pub base_url: String,

    pub page_ready_tag: String,
    pub control_css: String,
    pub option_css: String,

    /// `{label}` is replaced by the label as an XPath string literal
    pub option_xpath_template: String,

    pub download_link_xpath: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(defaults::INPUT_PATH),
            output_path: PathBuf::from(defaults::OUTPUT_PATH),
            field_delimiter: defaults::FIELD_DELIMITER.to_string(),
            list_separator: defaults::LIST_SEPARATOR.to_string(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            range_start: defaults::RANGE_START,
            range_end: defaults::RANGE_END,
            default_minimal_flag: crate::domain::constants::DEFAULT_MINIMAL_FLAG.to_string(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            restart_after: defaults::RESTART_AFTER,
            page_ready_timeout_ms: defaults::PAGE_READY_TIMEOUT_MS,
            control_timeout_ms: defaults::CONTROL_TIMEOUT_MS,
            download_timeout_ms: defaults::DOWNLOAD_TIMEOUT_MS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
            page_settle_ms: defaults::PAGE_SETTLE_MS,
            control_settle_ms: defaults::CONTROL_SETTLE_MS,
            selection_settle_ms: defaults::SELECTION_SETTLE_MS,
            entry_cooldown_ms: defaults::ENTRY_COOLDOWN_MS,
            restart_cooldown_ms: defaults::RESTART_COOLDOWN_MS,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: defaults::WEBDRIVER_URL.to_string(),
            chrome_args: defaults::CHROME_ARGS.iter().map(|s| (*s).to_string()).collect(),
            chrome_binary: None,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SITE_BASE_URL.to_string(),
            page_ready_tag: defaults::PAGE_READY_TAG.to_string(),
            control_css: defaults::CONTROL_CSS.to_string(),
            option_css: defaults::OPTION_CSS.to_string(),
            option_xpath_template: defaults::OPTION_XPATH_TEMPLATE.to_string(),
            download_link_xpath: defaults::DOWNLOAD_LINK_XPATH.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
        }
    }
}

impl IoConfig {
    /// Field delimiter as the byte the CSV reader expects
    #[must_use]
    pub fn field_delimiter(&self) -> u8 {
        self.field_delimiter.bytes().next().unwrap_or(b',')
    }

    #[must_use]
    pub fn list_separator(&self) -> char {
        self.list_separator.chars().next().unwrap_or(';')
    }
}

impl HarvestConfig {
    #[must_use]
    pub const fn page_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.page_ready_timeout_ms)
    }

    #[must_use]
    pub const fn control_timeout(&self) -> Duration {
        Duration::from_millis(self.control_timeout_ms)
    }

    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_millis(self.download_timeout_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AppConfig {
    /// Validate cross-field constraints after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.range_start > self.catalog.range_end {
            return Err(ConfigError::validation(format!(
                "range_start ({}) cannot be greater than range_end ({})",
                self.catalog.range_start, self.catalog.range_end
            )));
        }

        if self.harvest.restart_after == 0 {
            return Err(ConfigError::validation("restart_after must be greater than 0"));
        }

        let delimiter = &self.io.field_delimiter;
        if delimiter.len() != 1 || !delimiter.is_ascii() {
            return Err(ConfigError::validation(format!(
                "field_delimiter must be a single ASCII character, got {delimiter:?}"
            )));
        }

        if self.io.list_separator.chars().count() != 1 {
            return Err(ConfigError::validation(format!(
                "list_separator must be a single character, got {:?}",
                self.io.list_separator
            )));
        }

        if self.io.list_separator == self.io.field_delimiter {
            return Err(ConfigError::validation(
                "list_separator must differ from field_delimiter",
            ));
        }

        if self.catalog.default_minimal_flag.contains(self.io.list_separator.as_str()) {
            return Err(ConfigError::validation(
                "default_minimal_flag cannot contain the list separator",
            ));
        }

        for (name, value) in [
            ("page_ready_timeout_ms", self.harvest.page_ready_timeout_ms),
            ("control_timeout_ms", self.harvest.control_timeout_ms),
            ("download_timeout_ms", self.harvest.download_timeout_ms),
            ("poll_interval_ms", self.harvest.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(format!("{name} must be greater than 0")));
            }
        }

        if !self.site.option_xpath_template.contains("{label}") {
            return Err(ConfigError::validation(
                "option_xpath_template must contain a {label} placeholder",
            ));
        }

        url::Url::parse(&self.site.base_url).map_err(|e| {
            ConfigError::validation(format!("site base_url {:?} is invalid: {e}", self.site.base_url))
        })?;

        Ok(())
    }
}

/// Configuration manager for loading and writing settings
pub struct ConfigManager {
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    pub const ENV_PREFIX: &'static str = "PMD_HARVEST";

    /// File stem searched in the working directory when no path is given
    pub const DEFAULT_FILE_STEM: &'static str = "harvester_config";

    #[must_use]
    pub const fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Per-user configuration directory
    #[must_use]
    pub fn get_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pmd-sprite-harvester"))
    }

    /// Load defaults, then the file layer, then the environment, and validate
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        builder = match &self.config_path {
            Some(path) => {
                info!("Loading configuration from {:?}", path);
                builder.add_source(config::File::from(path.as_path()).required(true))
            }
            None => {
                if let Some(dir) = Self::get_config_dir() {
                    let user_file = dir.join(Self::DEFAULT_FILE_STEM);
                    builder = builder.add_source(
                        config::File::with_name(&user_file.to_string_lossy()).required(false),
                    );
                }
                builder.add_source(config::File::with_name(Self::DEFAULT_FILE_STEM).required(false))
            }
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration as a pretty JSON template
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&AppConfig::default())?;
        std::fs::write(path, content)?;
        info!("Saved default configuration to: {:?}", path);
        Ok(())
    }

    #[must_use]
    pub const fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

/// Default configuration values
pub mod defaults {
    pub const INPUT_PATH: &str = "pokemon_data.csv";
    pub const OUTPUT_PATH: &str = "pokemon_selenium.csv";
    pub const FIELD_DELIMITER: &str = ",";
    pub const LIST_SEPARATOR: &str = ";";

    pub const RANGE_START: u32 = 1;
    pub const RANGE_END: u32 = 1025;

    /// Every entry gets a fresh browser session
    pub const RESTART_AFTER: u32 = 1;

    pub const PAGE_READY_TIMEOUT_MS: u64 = 15_000;
    pub const CONTROL_TIMEOUT_MS: u64 = 10_000;
    pub const DOWNLOAD_TIMEOUT_MS: u64 = 5_000;
    pub const POLL_INTERVAL_MS: u64 = 500;

    pub const PAGE_SETTLE_MS: u64 = 2_000;
    pub const CONTROL_SETTLE_MS: u64 = 1_000;
    pub const SELECTION_SETTLE_MS: u64 = 2_000;
    pub const ENTRY_COOLDOWN_MS: u64 = 1_000;
    pub const RESTART_COOLDOWN_MS: u64 = 2_000;

    pub const WEBDRIVER_URL: &str = "http://localhost:9515";
    pub const CHROME_ARGS: &[&str] = &[
        "--headless",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--window-size=1920,1080",
        "--disable-gpu",
        "--disable-extensions",
    ];

    pub const SITE_BASE_URL: &str = "https://sprites.pmdcollab.org/";
    pub const PAGE_READY_TAG: &str = "body";
    pub const CONTROL_CSS: &str = "[role='button'][aria-haspopup='listbox']";
    pub const OPTION_CSS: &str = "[role='option']";
    pub const OPTION_XPATH_TEMPLATE: &str = "//*[@role='option' and normalize-space()={label}]";
    pub const DOWNLOAD_LINK_XPATH: &str = "//a[contains(@href, 'sprites.zip')]";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_FILE_NAME: &str = "harvester.log";
    pub const LOG_MAX_FILES: u32 = 5;
    pub const LOG_AUTO_CLEANUP: bool = true;
}
