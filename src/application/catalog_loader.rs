//! Catalog loader: identifier parsing and range filtering

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::errors::{RunError, RunResult};
use crate::domain::constants::columns;
use crate::domain::{CatalogEntry, Identifier, IdentifierRange};
use crate::infrastructure::table::CatalogTable;

/// Parsed view of a catalog table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedCatalog {
    /// Identifier of every row, in row order
    pub identifiers: Vec<Identifier>,

    /// Entries to harvest: in range, first occurrence only, in row order
    pub entries: Vec<CatalogEntry>,
}

pub struct CatalogLoader {
    range: IdentifierRange,
}

impl CatalogLoader {
    #[must_use]
    pub const fn new(range: IdentifierRange) -> Self {
        Self { range }
    }

    /// Parse every row's identifier and select the entries in range.
    ///
    /// Any non-numeric identifier fails the whole load, even outside the range.
    pub fn load(&self, table: &CatalogTable) -> RunResult<LoadedCatalog> {
        let number_col = table
            .column(columns::NUMBER)
            .ok_or_else(|| RunError::missing_column(columns::NUMBER))?;
        let name_col = table
            .column(columns::NAME)
            .ok_or_else(|| RunError::missing_column(columns::NAME))?;

        let mut identifiers = Vec::with_capacity(table.len());
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for (row_index, row) in table.rows().iter().enumerate() {
            let raw = row.get(number_col);
            let identifier: Identifier = raw
                .parse()
                .map_err(|_| RunError::invalid_identifier(row_index, raw))?;
            identifiers.push(identifier);

            if !self.range.contains(identifier) {
                continue;
            }
            if !seen.insert(identifier) {
                warn!(
                    "⚠️ Duplicate identifier {} on line {}, harvesting it once",
                    identifier,
                    row_index + 2
                );
                continue;
            }
            entries.push(CatalogEntry::new(identifier, row.get(name_col), row_index));
        }

        info!(
            "Loaded {} rows, {} entries in range {}",
            identifiers.len(),
            entries.len(),
            self.range
        );
        debug!("First entry in range: {:?}", entries.first());

        Ok(LoadedCatalog {
            identifiers,
            entries,
        })
    }
}
