//! Infrastructure layer - browser automation, table I/O, configuration and logging

pub mod browser;
pub mod config;
pub mod logging;
pub mod table;
pub mod webdriver;

pub use browser::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, Selector, WaitCondition,
};
pub use config::{AppConfig, ConfigError, ConfigManager};
pub use logging::{init_logging_with_config, log_system_info};
pub use table::{CatalogTable, TableRow, TableWriter};
pub use webdriver::{WebDriverLauncher, WebDriverSession};
