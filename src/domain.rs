//! Domain module - catalog entries, variation records and flag sequences
//!
//! Pure types shared by every stage of a harvest run. Nothing in here touches
//! a browser, a file or the clock.

pub mod catalog;
pub mod constants;
pub mod errors;
pub mod minimal_flags;
pub mod variation;

// Re-export commonly used items for convenience
pub use catalog::{CatalogEntry, Identifier, IdentifierParseError, IdentifierRange};
pub use errors::{OptionSkip, SkipReason};
pub use minimal_flags::MinimalFlagSequence;
pub use variation::{HarvestMap, Variation, VariationRecord, extract_path_fragment};
