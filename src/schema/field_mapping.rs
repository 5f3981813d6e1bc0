//! Column alias resolution
//!
//! Exports do not agree on the spelling of some columns. A `ColumnAliases`
//! lists the accepted names of one logical column in priority order and
//! resolves them against whatever columns a dataset or table actually has.

/// Accepted names of one logical column, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAliases {
    /// Role of the column, used in messages ("company", "country")
    pub role: &'static str,
    /// Candidate column names; matching is exact and case-sensitive
    pub candidates: &'static [&'static str],
}

impl ColumnAliases {
    /// Create an alias list
    #[must_use]
    pub const fn new(role: &'static str, candidates: &'static [&'static str]) -> Self {
        Self { role, candidates }
    }

    /// First candidate present in `columns`, or `None` when none is
    #[must_use]
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> Option<&'static str> {
        self.candidates
            .iter()
            .copied()
            .find(|candidate| columns.iter().any(|c| c.as_ref() == *candidate))
    }

    /// All candidates present in `columns`, in priority order
    #[must_use]
    pub fn present<S: AsRef<str>>(&self, columns: &[S]) -> Vec<&'static str> {
        self.candidates
            .iter()
            .copied()
            .filter(|candidate| columns.iter().any(|c| c.as_ref() == *candidate))
            .collect()
    }

    /// Candidate names as owned strings, for error reporting
    #[must_use]
    pub fn candidate_names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| (*c).to_string()).collect()
    }
}
