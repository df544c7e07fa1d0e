use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Instrument, info, info_span};

use pmd_sprite_harvester_lib::application::{Pipeline, RunSummary};
use pmd_sprite_harvester_lib::infrastructure::config::ConfigManager;
use pmd_sprite_harvester_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use pmd_sprite_harvester_lib::infrastructure::webdriver::WebDriverLauncher;

/// Harvest PMD sprite variation archives into the catalog table
#[derive(Parser, Debug)]
#[command(name = "pmd-sprite-harvester", version, about)]
struct Cli {
    /// Only update the minimal_variants column, without scraping
    #[arg(long)]
    minimal_only: bool,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the default configuration as JSON to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["minimal_only", "config"])]
    write_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = cli.write_config {
        ConfigManager::write_default(&path)
            .with_context(|| format!("Failed to write configuration template to {}", path.display()))?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let manager = ConfigManager::new(cli.config);
    let config = manager.load().context("Failed to load configuration")?;
    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    log_system_info();
    match manager.config_path() {
        Some(path) => info!("Configuration file: {}", path.display()),
        None => info!(
            "Configuration: defaults, optional {}.* file, {}__* environment",
            ConfigManager::DEFAULT_FILE_STEM,
            ConfigManager::ENV_PREFIX
        ),
    }

    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("run", %run_id);
    let pipeline = Pipeline::new(config);

    let summary: RunSummary = if cli.minimal_only {
        span.in_scope(|| pipeline.reconcile_only())
            .context("Reconcile-only run failed")?
    } else {
        let launcher = WebDriverLauncher::new(
            pipeline.config().browser.clone(),
            &pipeline.config().harvest,
        );
        pipeline
            .full(launcher)
            .instrument(span.clone())
            .await
            .context("Harvest run failed")?
    };

    let _entered = span.enter();
    info!("Total rows processed: {}", summary.rows_written);
    info!("Output file created: {}", summary.output_path.display());
    match serde_json::to_string(&summary) {
        Ok(json) => info!("Run summary: {}", json),
        Err(e) => tracing::warn!("Could not serialize run summary: {}", e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["pmd-sprite-harvester", "--minimal-only"]).unwrap();
        assert!(cli.minimal_only);
        assert!(cli.write_config.is_none());

        let cli = Cli::try_parse_from(["pmd-sprite-harvester", "--write-config", "harvester_config.json"]).unwrap();
        assert_eq!(cli.write_config, Some(PathBuf::from("harvester_config.json")));
    }

    #[test]
    fn test_write_config_excludes_run_flags() {
        let result = Cli::try_parse_from(["pmd-sprite-harvester", "--write-config", "a.json", "--minimal-only"]);
        assert!(result.is_err());
    }
}
