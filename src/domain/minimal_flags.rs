//! Per-variation minimal flags
//!
//! Flags are free-form tokens (usually `1`/`0`) edited by hand between runs.
//! The only rule enforced here is length: after reconciliation there is
//! exactly one flag per variation, and the stored prefix is never rewritten.

use super::variation::join_with;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinimalFlagSequence(Vec<String>);

impl MinimalFlagSequence {
    /// Split a stored cell; an empty cell holds no flags
    #[must_use]
    pub fn parse(cell: &str, separator: char) -> Self {
        if cell.is_empty() {
            Self::default()
        } else {
            Self(cell.split(separator).map(str::to_owned).collect())
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Resize to exactly `count` flags: drop the tail or pad with `default`
    #[must_use]
    pub fn reconciled(mut self, count: usize, default: &str) -> Self {
        self.0.truncate(count);
        self.0.resize(count, default.to_owned());
        self
    }

    #[must_use]
    pub fn join(&self, separator: char) -> String {
        join_with(self.0.iter().map(String::as_str), separator)
    }
}

impl<S: Into<String>> FromIterator<S> for MinimalFlagSequence {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
