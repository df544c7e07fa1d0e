//! Application layer
//!
//! Orchestrates one run: load the catalog, harvest variations through a
//! browser session, reconcile each row and write the output table.

pub mod catalog_loader;
pub mod errors;
pub mod harvester;
pub mod pipeline;
pub mod reconciler;

pub use catalog_loader::{CatalogLoader, LoadedCatalog};
pub use errors::{RunError, RunResult};
pub use harvester::{
    EntryOutcome, HarvestReport, HarvestSettings, HarvestStats, Harvester, OptionOutcome,
    SitePlan, xpath_literal,
};
pub use pipeline::{Pipeline, RunMode, RunSummary};
pub use reconciler::{FlagChange, OutputLayout, Reconciler, RowVariations};
