//! PMD sprite harvester
//!
//! Collects the sprite-variation archive paths of every catalog entry from
//! the PMD sprite repository site with a headless browser, and keeps the
//! per-variation `minimal_variants` flags of the catalog table in step with
//! the number of variations found.

pub mod application;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

pub use application::{Pipeline, RunError, RunMode, RunSummary};
pub use infrastructure::config::{AppConfig, ConfigManager};
