//! Run pipeline: load → (harvest) → reconcile → write

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use super::catalog_loader::{CatalogLoader, LoadedCatalog};
use super::errors::RunResult;
use super::harvester::{HarvestSettings, HarvestStats, Harvester, SitePlan};
use super::reconciler::{FlagChange, OutputLayout, Reconciler, RowVariations};
use crate::domain::{HarvestMap, IdentifierRange};
use crate::infrastructure::browser::BrowserLauncher;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::table::{CatalogTable, TableWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Harvest the site, then reconcile every row
    Full,

    /// Resize flags from the stored paths only; no browser
    ReconcileOnly,
}

/// What one run did, logged at the end as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub entries_in_range: usize,
    pub rows_with_new_variations: usize,
    pub flag_cells_changed: usize,
    pub harvest: Option<HarvestStats>,
}

#[derive(Debug, Default)]
struct WriteStats {
    rows_written: usize,
    rows_with_new_variations: usize,
    flag_cells_changed: usize,
}

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    #[must_use]
    pub const fn new(config: AppConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Reconcile flags against the paths already in the table
    pub fn reconcile_only(&self) -> RunResult<RunSummary> {
        info!("📝 Updating minimal_variants only (no browser)");
        let (table, loaded) = self.load()?;
        let entries_in_range = loaded.entries.len();

        let stats = self.write(table, &loaded, RunMode::ReconcileOnly, None)?;
        Ok(self.summary(RunMode::ReconcileOnly, entries_in_range, &stats, None))
    }

    /// Harvest every entry in range with sessions from `launcher`, then
    /// write the reconciled table
    pub async fn full<L: BrowserLauncher>(&self, launcher: L) -> RunResult<RunSummary> {
        let (table, loaded) = self.load()?;
        let entries_in_range = loaded.entries.len();

        let harvester = Harvester::new(
            launcher,
            SitePlan::from_config(&self.config.site)?,
            HarvestSettings::from(&self.config.harvest),
        );
        let report = harvester.harvest_all(&loaded.entries).await?;
        info!("Data obtained for {} entries", report.records.len());

        let stats = self.write(table, &loaded, RunMode::Full, Some(&report.records))?;
        Ok(self.summary(RunMode::Full, entries_in_range, &stats, Some(report.stats)))
    }

    fn load(&self) -> RunResult<(CatalogTable, LoadedCatalog)> {
        let io = &self.config.io;
        info!("Reading catalog from {}", io.input_path.display());
        let table = CatalogTable::read(&io.input_path, io.field_delimiter())?;

        let range = IdentifierRange::new(self.config.catalog.range_start, self.config.catalog.range_end);
        let loaded = CatalogLoader::new(range).load(&table)?;
        Ok((table, loaded))
    }

    fn write(
        &self,
        table: CatalogTable,
        loaded: &LoadedCatalog,
        mode: RunMode,
        records: Option<&HarvestMap>,
    ) -> RunResult<WriteStats> {
        let io = &self.config.io;
        let (headers, rows) = table.into_parts();
        let layout = OutputLayout::new(&headers, mode == RunMode::Full);
        let reconciler = Reconciler::new(
            io.list_separator(),
            self.config.catalog.default_minimal_flag.as_str(),
        );

        let mut writer = TableWriter::create(&io.output_path, io.field_delimiter(), layout.headers())?;
        let mut stats = WriteStats::default();

        for (row, identifier) in rows.iter().zip(&loaded.identifiers) {
            let variations = match records.and_then(|r| r.get(identifier)) {
                Some(record) => {
                    stats.rows_with_new_variations += 1;
                    RowVariations::Harvested(record)
                }
                None => RowVariations::Stored(reconciler.stored_variations(row, &layout)),
            };

            let (out, change) = reconciler.reconcile_row(row, &layout, variations);
            match change {
                FlagChange::Kept => {}
                FlagChange::Truncated { dropped } => {
                    debug!("Removed {} extra minimal_variants for {}", dropped, identifier);
                }
                FlagChange::Padded { added } => {
                    debug!("Added {} missing minimal_variants for {}", added, identifier);
                }
            }
            if change.is_change() {
                stats.flag_cells_changed += 1;
            }

            writer.write_row(&out)?;
        }

        stats.rows_written = writer.finish()?;
        info!(
            "✅ Wrote {} rows to {} ({} flag cells changed)",
            stats.rows_written,
            io.output_path.display(),
            stats.flag_cells_changed
        );
        Ok(stats)
    }

    fn summary(
        &self,
        mode: RunMode,
        entries_in_range: usize,
        stats: &WriteStats,
        harvest: Option<HarvestStats>,
    ) -> RunSummary {
        RunSummary {
            mode,
            output_path: self.config.io.output_path.clone(),
            rows_written: stats.rows_written,
            entries_in_range,
            rows_with_new_variations: stats.rows_with_new_variations,
            flag_cells_changed: stats.flag_cells_changed,
            harvest,
        }
    }
}
