//! Logging system configuration and initialization
//!
//! - Console and file output, each optional
//! - Plain or JSON formatted log file
//! - Local-time timestamps
//! - The previous run's log is renamed with its timestamp before a new one starts
//! - Old log files beyond `max_files` are removed on startup

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writer flushing until the process exits
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Dependency targets clamped unless the configured level is trace
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("thirtyfour", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("reqwest", "info"),
    ("h2", "warn"),
    ("tokio", "info"),
    ("runtime", "warn"),
];

/// Timestamps in the machine's local time zone
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Configured directory, falling back to `logs/` next to the executable
#[must_use]
pub fn resolve_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(get_log_directory)
}

/// Rename an existing log file to `<stem>.<YYYYMMDDTHHMMSS>.log`
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<Option<PathBuf>> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(None);
    }

    let metadata = fs::metadata(&log_file_path).context("Failed to get log file metadata")?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());
    let datetime: DateTime<Local> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let mut timestamped_path =
        log_dir.join(format!("{file_stem}.{}.log", datetime.format("%Y%m%dT%H%M%S")));
    let mut suffix = 1;
    while timestamped_path.exists() {
        timestamped_path = log_dir.join(format!(
            "{file_stem}.{}-{suffix}.log",
            datetime.format("%Y%m%dT%H%M%S")
        ));
        suffix += 1;
    }

    fs::rename(&log_file_path, &timestamped_path).with_context(|| {
        format!(
            "Failed to rotate log file {} to {}",
            log_file_path.display(),
            timestamped_path.display()
        )
    })?;

    Ok(Some(timestamped_path))
}

/// Remove the oldest `.log` files so at most `max_files` remain
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path.extension().is_some_and(|ext| ext == "log");
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files as usize) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to remove old log file {:?}: {}", path, e),
        }
    }

    Ok(removed)
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;

    if !config.level.to_lowercase().contains("trace") {
        for (target, level) in NOISY_TARGETS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
    }

    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// `RUST_LOG` overrides the configured level entirely:
/// ```bash
/// RUST_LOG="debug,thirtyfour=debug" pmd-sprite-harvester
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(config)?;
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let log_dir = resolve_log_directory(config);
    let mut rotated = None;
    let mut removed = 0;

    if config.file_output {
        fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        rotated = rotate_existing_log_file(&log_dir, &config.file_name)?;
        if config.auto_cleanup_logs {
            removed = cleanup_old_logs(&log_dir, config.max_files)?;
        }

        let (file_writer, file_guard) = non_blocking(rolling::never(&log_dir, &config.file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        if config.json_format {
            layers.push(
                file_layer
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .boxed(),
            );
        } else {
            layers.push(file_layer.with_target(false).boxed());
        }
    }

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    Registry::default()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    info!("Logging system initialized (level: {})", config.level);
    if config.file_output {
        info!("Log file: {:?}", log_dir.join(&config.file_name));
        if let Some(path) = rotated {
            info!("Rotated previous log file to: {:?}", path);
        }
        if removed > 0 {
            info!("Removed {} old log files (keeping {})", removed, config.max_files);
        }
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== PMD Sprite Harvester ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    info!("============================");
}
