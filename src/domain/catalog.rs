//! Catalog identifiers and the entries selected for a harvest run

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::IDENTIFIER_WIDTH;

/// Numeric catalog identifier, displayed zero-padded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(u32);

impl Identifier {
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded form used in page URLs, e.g. `25` → `0025`
    #[must_use]
    pub fn padded(self) -> String {
        format!("{:0width$}", self.0, width = IDENTIFIER_WIDTH)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.padded())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{raw}' is not a non-negative integer")]
pub struct IdentifierParseError {
    pub raw: String,
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| IdentifierParseError { raw: s.to_string() })
    }
}

/// Inclusive identifier range selected for a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierRange {
    start: Identifier,
    end: Identifier,
}

impl IdentifierRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self {
            start: Identifier(start),
            end: Identifier(end),
        }
    }

    #[must_use]
    pub const fn start(&self) -> Identifier {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Identifier {
        self.end
    }

    /// Both bounds are included
    #[must_use]
    pub fn contains(&self, id: Identifier) -> bool {
        self.start <= id && id <= self.end
    }
}

impl fmt::Display for IdentifierRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// One catalog row selected for harvesting.
///
/// The entry only carries what the harvester needs; every other column stays
/// in the table row at `row_index` and is written back untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub identifier: Identifier,
    pub name: String,
    pub row_index: usize,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(identifier: Identifier, name: impl Into<String>, row_index: usize) -> Self {
        Self {
            identifier,
            name: name.into(),
            row_index,
        }
    }
}
