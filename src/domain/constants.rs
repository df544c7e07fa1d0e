//! Catalog table layout and fixed site characteristics

/// Column names of the catalog table
pub mod columns {
    /// Numeric catalog identifier
    pub const NUMBER: &str = "number";

    /// Display name of the entry
    pub const NAME: &str = "name";

    /// Separator-joined archive path fragments, one per variation
    pub const VARIATIONS_PATHS: &str = "variations_paths";

    /// Separator-joined option labels, aligned with `VARIATIONS_PATHS`
    pub const VARIATION_TYPES: &str = "variation_types";

    /// Separator-joined per-variation flags, aligned with `VARIATIONS_PATHS`
    pub const MINIMAL_VARIANTS: &str = "minimal_variants";
}

/// Identifiers are zero-padded to this width in page URLs (`25` → `0025`)
pub const IDENTIFIER_WIDTH: usize = 4;

/// Flag appended for variations that have no stored flag yet
pub const DEFAULT_MINIMAL_FLAG: &str = "1";

/// Archive URL → path fragment.
///
/// `https://…/0025/0000/0001/sprites.zip` captures `0025/0000/0001`.
pub const ARCHIVE_PATH_PATTERN: &str = r"/(\d{4}(?:/\d{4})*)/sprites\.zip$";
