//! Row reconciliation
//!
//! Folds variation data into a table row and resizes its `minimal_variants`
//! cell so there is exactly one flag per variation. Pure: no I/O, no browser.

use crate::domain::constants::columns;
use crate::domain::{MinimalFlagSequence, VariationRecord};
use crate::infrastructure::table::TableRow;

/// Where a row's variation count comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVariations<'a> {
    /// Freshly harvested this run; the variation columns are rewritten
    Harvested(&'a VariationRecord),

    /// Already stored in the row as this many path fragments
    Stored(usize),

    /// No variation data at all; the flag cell is left as it is
    Absent,
}

/// What reconciliation did to the flag cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagChange {
    Kept,
    Truncated { dropped: usize },
    Padded { added: usize },
}

impl FlagChange {
    #[must_use]
    pub const fn is_change(self) -> bool {
        !matches!(self, Self::Kept)
    }
}

/// Column positions of the output table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    headers: Vec<String>,
    paths: Option<usize>,
    labels: Option<usize>,
    flags: usize,
}

impl OutputLayout {
    /// Input headers in order, plus `minimal_variants` when missing.
    ///
    /// With `with_variation_columns` the path and label columns are appended
    /// too when missing, so harvested data always has somewhere to go.
    #[must_use]
    pub fn new(input_headers: &[String], with_variation_columns: bool) -> Self {
        let mut headers = input_headers.to_vec();

        let mut ensure = |name: &str, required: bool| -> Option<usize> {
            headers.iter().position(|h| h == name).or_else(|| {
                required.then(|| {
                    headers.push(name.to_string());
                    headers.len() - 1
                })
            })
        };

        let paths = ensure(columns::VARIATIONS_PATHS, with_variation_columns);
        let labels = ensure(columns::VARIATION_TYPES, with_variation_columns);
        let flags = ensure(columns::MINIMAL_VARIANTS, true).unwrap_or_default();

        Self {
            headers,
            paths,
            labels,
            flags,
        }
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    #[must_use]
    pub const fn paths_column(&self) -> Option<usize> {
        self.paths
    }

    #[must_use]
    pub const fn flags_column(&self) -> usize {
        self.flags
    }
}

pub struct Reconciler {
    separator: char,
    default_flag: String,
}

impl Reconciler {
    #[must_use]
    pub fn new(separator: char, default_flag: impl Into<String>) -> Self {
        Self {
            separator,
            default_flag: default_flag.into(),
        }
    }

    /// Number of path fragments already stored in `row`
    #[must_use]
    pub fn stored_variations(&self, row: &TableRow, layout: &OutputLayout) -> usize {
        layout
            .paths
            .map_or(0, |col| VariationRecord::stored_count(row.get(col), self.separator))
    }

    /// Produce the output row for `row`. Columns outside the variation and
    /// flag columns are copied untouched.
    #[must_use]
    pub fn reconcile_row(
        &self,
        row: &TableRow,
        layout: &OutputLayout,
        variations: RowVariations<'_>,
    ) -> (TableRow, FlagChange) {
        let mut out = row.clone();
        out.fit_to(layout.width());

        let count = match variations {
            RowVariations::Harvested(record) if !record.is_empty() => {
                if let Some(col) = layout.paths {
                    out.set(col, record.joined_paths(self.separator));
                }
                if let Some(col) = layout.labels {
                    out.set(col, record.joined_labels(self.separator));
                }
                record.len()
            }
            RowVariations::Stored(count) if count > 0 => count,
            // Nothing to size against: hand-entered flags survive untouched
            _ => return (out, FlagChange::Kept),
        };

        let existing = MinimalFlagSequence::parse(out.get(layout.flags), self.separator);
        let before = existing.len();
        let flags = existing.reconciled(count, &self.default_flag);
        out.set(layout.flags, flags.join(self.separator));

        let change = match before.cmp(&count) {
            std::cmp::Ordering::Equal => FlagChange::Kept,
            std::cmp::Ordering::Greater => FlagChange::Truncated {
                dropped: before - count,
            },
            std::cmp::Ordering::Less => FlagChange::Padded {
                added: count - before,
            },
        };
        (out, change)
    }
}
