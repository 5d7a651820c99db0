//! Sparse, value-sorted feature columns.
//!
//! A [`FeatureVector`] holds one `(value, example_index)` pair for every
//! example whose value for the feature is present and non-zero, plus the
//! indices of examples whose value is missing. Examples in neither list
//! implicitly have the value zero. The refinement search requires the pairs
//! to be sorted ascending by value; ties form contiguous runs.

use crate::data::CoverageMask;

/// One `(value, example_index)` pair of a feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureEntry {
    /// The feature value. Never NaN and never exactly zero.
    pub value: f32,
    /// The index of the example the value belongs to.
    pub index: u32,
}

/// A sparse feature column: explicit non-zero values plus missing indices.
#[derive(Debug, Clone, Default)]
pub struct FeatureVector {
    entries: Vec<FeatureEntry>,
    missing: Vec<u32>,
}

impl FeatureVector {
    /// Create a vector from unsorted entries and missing indices.
    pub fn new(entries: Vec<FeatureEntry>, missing: Vec<u32>) -> Self {
        Self { entries, missing }
    }

    /// Number of explicit (non-zero, non-missing) entries.
    #[inline]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// The explicit entries, in their current order.
    #[inline]
    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    /// Indices of examples with a missing value for this feature.
    #[inline]
    pub fn missing_indices(&self) -> &[u32] {
        &self.missing
    }

    /// Sort the entries ascending by value.
    ///
    /// Ties keep their relative order so that repeated sorts are stable.
    pub fn sort_by_values(&mut self) {
        self.entries
            .sort_by(|a, b| a.value.total_cmp(&b.value).then(a.index.cmp(&b.index)));
    }

    /// A copy retaining only entries and missing indices of covered examples.
    pub fn filtered_by(&self, mask: &CoverageMask) -> FeatureVector {
        let entries = self
            .entries
            .iter()
            .filter(|e| mask.is_covered(e.index))
            .copied()
            .collect();
        let missing = self
            .missing
            .iter()
            .filter(|&&i| mask.is_covered(i))
            .copied()
            .collect();
        FeatureVector { entries, missing }
    }

    /// Drop entries and missing indices of uncovered examples in place.
    pub fn retain_covered(&mut self, mask: &CoverageMask) {
        self.entries.retain(|e| mask.is_covered(e.index));
        self.missing.retain(|&i| mask.is_covered(i));
    }
}
