//! Fatal run errors
//!
//! Anything in here aborts the run. Per-entry and per-option problems are
//! skips and live in `domain::errors`.

use thiserror::Error;

use crate::infrastructure::browser::BrowserError;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Input table is missing required column '{column}'")]
    MalformedInput { column: String },

    #[error("Line {line}: identifier '{value}' is not a non-negative integer")]
    InvalidIdentifier { line: usize, value: String },

    #[error("Could not start a browser session")]
    SessionUnavailable {
        #[source]
        source: BrowserError,
    },

    #[error("Site base URL is invalid: {0}")]
    InvalidSite(#[from] url::ParseError),

    #[error("Table I/O failed: {0}")]
    Table(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    pub fn missing_column(column: &str) -> Self {
        Self::MalformedInput {
            column: column.to_string(),
        }
    }

    /// `row_index` is the 0-based data row; the reported line counts the header
    pub fn invalid_identifier(row_index: usize, value: &str) -> Self {
        Self::InvalidIdentifier {
            line: row_index + 2,
            value: value.to_string(),
        }
    }

    pub const fn session_unavailable(source: BrowserError) -> Self {
        Self::SessionUnavailable { source }
    }
}

pub type RunResult<T> = Result<T, RunError>;
