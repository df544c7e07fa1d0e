//! Skip reasons for entries and options
//!
//! None of these abort a run. They are logged, counted and the harvest moves
//! on to the next option or entry.

use thiserror::Error;

/// Why a catalog entry produced no record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("Page-ready signal did not arrive within {timeout_ms} ms")]
    DiscoveryTimeout { timeout_ms: u64 },

    #[error("Options control not found within {timeout_ms} ms")]
    ControlNotFound { timeout_ms: u64 },

    #[error("No option resolved to a downloadable archive")]
    NoVariations,
}

impl SkipReason {
    /// Stable key used when tallying skips in the run summary
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DiscoveryTimeout { .. } => "discovery_timeout",
            Self::ControlNotFound { .. } => "control_not_found",
            Self::NoVariations => "no_variations",
        }
    }
}

/// Why a single option label was left out of a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionSkip {
    #[error("No download link appeared for '{label}'")]
    NoDownloadLinkFound { label: String },

    #[error("Download URL for '{label}' does not match the archive pattern: {url}")]
    PatternMismatch { label: String, url: String },

    #[error("Transient UI failure on '{label}': {message}")]
    TransientUi { label: String, message: String },
}

impl OptionSkip {
    pub fn no_download_link(label: &str) -> Self {
        Self::NoDownloadLinkFound {
            label: label.to_string(),
        }
    }

    pub fn pattern_mismatch(label: &str, url: &str) -> Self {
        Self::PatternMismatch {
            label: label.to_string(),
            url: url.to_string(),
        }
    }

    pub fn transient_ui(label: &str, message: impl ToString) -> Self {
        Self::TransientUi {
            label: label.to_string(),
            message: message.to_string(),
        }
    }
}
