//! Harvested variations and path-fragment extraction

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::catalog::Identifier;
use super::constants::ARCHIVE_PATH_PATTERN;

static ARCHIVE_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(ARCHIVE_PATH_PATTERN).expect("archive path pattern compiles"));

/// Extract the path fragment (with trailing slash) from an archive URL.
///
/// Returns `None` when the URL does not end in a run of 4-digit segments
/// followed by `sprites.zip`.
#[must_use]
pub fn extract_path_fragment(url: &str) -> Option<String> {
    ARCHIVE_PATH_RE
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|segments| format!("{}/", segments.as_str()))
}

/// One selectable option that resolved to a downloadable archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    pub label: String,
    pub path_fragment: String,
}

impl Variation {
    #[must_use]
    pub fn new(label: impl Into<String>, path_fragment: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path_fragment: path_fragment.into(),
        }
    }
}

/// Ordered variations of one catalog entry.
///
/// Order is significant: position `i` pairs a label, a path fragment and
/// (after reconciliation) a minimal flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariationRecord {
    variations: Vec<Variation>,
}

impl VariationRecord {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            variations: Vec::new(),
        }
    }

    pub fn push(&mut self, variation: Variation) {
        self.variations.push(variation);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variation> {
        self.variations.iter()
    }

    #[must_use]
    pub fn joined_paths(&self, separator: char) -> String {
        join_with(self.variations.iter().map(|v| v.path_fragment.as_str()), separator)
    }

    #[must_use]
    pub fn joined_labels(&self, separator: char) -> String {
        join_with(self.variations.iter().map(|v| v.label.as_str()), separator)
    }

    /// Number of variations stored in a joined cell; an empty cell holds none
    #[must_use]
    pub fn stored_count(cell: &str, separator: char) -> usize {
        if cell.is_empty() {
            0
        } else {
            cell.split(separator).count()
        }
    }
}

impl FromIterator<Variation> for VariationRecord {
    fn from_iter<I: IntoIterator<Item = Variation>>(iter: I) -> Self {
        Self {
            variations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VariationRecord {
    type Item = &'a Variation;
    type IntoIter = std::slice::Iter<'a, Variation>;

    fn into_iter(self) -> Self::IntoIter {
        self.variations.iter()
    }
}

/// Identifier → record, built during one harvest run only
pub type HarvestMap = HashMap<Identifier, VariationRecord>;

pub(crate) fn join_with<'a>(parts: impl Iterator<Item = &'a str>, separator: char) -> String {
    let mut out = String::new();
    for (i, part) in parts.enumerate() {
        if i > 0 {
            out.push(separator);
        }
        out.push_str(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_path_fragment_from_archive_url() {
        assert_eq!(
            extract_path_fragment("https://spriteserver.pmdcollab.org/assets/0025/sprites.zip"),
            Some("0025/".to_string())
        );
        assert_eq!(
            extract_path_fragment("https://host/assets/0025/0000/0001/sprites.zip"),
            Some("0025/0000/0001/".to_string())
        );
    }

    #[test]
    fn test_extract_path_fragment_rejects_other_urls() {
        assert_eq!(extract_path_fragment("https://host/assets/25/sprites.zip"), None);
        assert_eq!(extract_path_fragment("https://host/assets/0025/portraits.zip"), None);
        assert_eq!(extract_path_fragment("https://host/assets/0025/sprites.zip?x=1"), None);
        assert_eq!(extract_path_fragment(""), None);
    }

    #[test]
    fn test_record_joins_in_order() {
        let record: VariationRecord = [
            Variation::new("Normal", "0025/"),
            Variation::new("Shiny", "0025/0000/0001/"),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.len(), 2);
        assert_eq!(record.joined_paths(';'), "0025/;0025/0000/0001/");
        assert_eq!(record.joined_labels(';'), "Normal;Shiny");
    }

    #[test]
    fn test_stored_count() {
        assert_eq!(VariationRecord::stored_count("", ';'), 0);
        assert_eq!(VariationRecord::stored_count("a/", ';'), 1);
        assert_eq!(VariationRecord::stored_count("a/;b/", ';'), 2);
        assert_eq!(VariationRecord::stored_count("a/;;b/", ';'), 3);
    }
}
