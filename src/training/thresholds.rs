//! Cached, filter-on-refine access to feature vectors.
//!
//! [`ExactThresholds`] owns a lazily filled cache of value-sorted base
//! feature vectors. A [`ThresholdsSubset`] scopes one rule's growth: it
//! tracks which examples the partial rule still covers via a
//! [`CoverageMask`] and keeps a per-feature cache of filtered vectors that
//! only contain the covered examples. A cache entry carries the number of
//! conditions at its last update; entries older than the subset's
//! modification counter are rebuilt from the mask on the next touch.

use std::collections::HashMap;

use crate::data::{CoverageMask, FeatureMatrix, FeatureVector, NominalMask, WeightVector};
use crate::model::Comparator;
use crate::statistics::SlotStatistics;
use crate::training::refinement::Refinement;

// ============================================================================
// ExactThresholds
// ============================================================================

/// Provides access to all thresholds resulting from the feature values of
/// the training examples.
pub struct ExactThresholds<'a, F: FeatureMatrix> {
    feature_matrix: &'a F,
    nominal_mask: &'a NominalMask,
    /// Base feature vectors, fetched and sorted on first touch and kept for
    /// the lifetime of training.
    cache: HashMap<u32, FeatureVector>,
}

impl<'a, F: FeatureMatrix> ExactThresholds<'a, F> {
    /// Create thresholds over the given feature matrix.
    pub fn new(feature_matrix: &'a F, nominal_mask: &'a NominalMask) -> Self {
        Self {
            feature_matrix,
            nominal_mask,
            cache: HashMap::new(),
        }
    }

    /// Number of training examples.
    pub fn num_examples(&self) -> u32 {
        self.feature_matrix.num_rows()
    }

    /// Number of features.
    pub fn num_features(&self) -> u32 {
        self.feature_matrix.num_features()
    }

    /// Create a subset scoped to one rule's growth.
    ///
    /// Installs the sampled weights into the live statistics: the
    /// sub-sample prediction is reset to the committed prediction and every
    /// positive-weight example is registered.
    pub fn create_subset<'b>(
        &'b mut self,
        weights: &'b WeightVector,
        statistics: &mut SlotStatistics,
    ) -> ThresholdsSubset<'b, 'a, F> {
        statistics.reset_sampled_statistics();
        for i in 0..weights.num_examples() {
            let weight = weights.weight(i);
            if weight > 0 {
                statistics.add_sampled_statistic(i, weight);
            }
        }

        let num_examples = self.num_examples();
        ThresholdsSubset {
            thresholds: self,
            weights,
            num_covered_examples: weights.num_non_zero_weights(),
            coverage_mask: CoverageMask::new(num_examples as usize),
            num_modifications: 0,
            cache_filtered: HashMap::new(),
        }
    }
}

// ============================================================================
// ThresholdsSubset
// ============================================================================

/// A filtered cache entry. `num_conditions` records how many conditions the
/// rule contained when the vector was filtered last; the vector is valid
/// iff that count equals the subset's current modification counter.
#[derive(Debug, Default)]
struct FilteredCacheEntry {
    vector: Option<FeatureVector>,
    num_conditions: u32,
}

/// Access to the thresholds still covered by a partially grown rule.
pub struct ThresholdsSubset<'b, 'a, F: FeatureMatrix> {
    thresholds: &'b mut ExactThresholds<'a, F>,
    weights: &'b WeightVector,
    num_covered_examples: u32,
    coverage_mask: CoverageMask,
    num_modifications: u32,
    cache_filtered: HashMap<u32, FilteredCacheEntry>,
}

impl<'b, 'a, F: FeatureMatrix> ThresholdsSubset<'b, 'a, F> {
    /// Number of examples covered by the conditions committed so far, in
    /// the current sub-sample.
    pub fn num_covered_examples(&self) -> u32 {
        self.num_covered_examples
    }

    /// Whether feature `feature` is nominal.
    pub fn is_nominal(&self, feature: u32) -> bool {
        self.thresholds.nominal_mask.is_nominal(feature)
    }

    /// The coverage mask of the partial rule.
    pub fn coverage_mask(&self) -> &CoverageMask {
        &self.coverage_mask
    }

    /// Make the cached vector of `feature` current: fetch and sort the base
    /// vector on first touch, then refilter against the coverage mask if
    /// conditions were committed since the last filter.
    ///
    /// Must be called (sequentially) before [`feature_vector`](Self::feature_vector).
    pub fn prepare_feature(&mut self, feature: u32) {
        let entry = self.cache_filtered.entry(feature).or_default();

        if entry.vector.is_none() && !self.thresholds.cache.contains_key(&feature) {
            let mut vector = self.thresholds.feature_matrix.fetch_feature_vector(feature);
            vector.sort_by_values();
            self.thresholds.cache.insert(feature, vector);
        }

        if self.num_modifications > entry.num_conditions {
            if let Some(vector) = entry.vector.as_mut() {
                vector.retain_covered(&self.coverage_mask);
            } else {
                entry.vector =
                    Some(self.thresholds.cache[&feature].filtered_by(&self.coverage_mask));
            }
            entry.num_conditions = self.num_modifications;
        }
    }

    /// The currently valid vector of `feature`: the filtered vector if one
    /// exists, the base vector otherwise.
    ///
    /// # Panics
    /// Panics if [`prepare_feature`](Self::prepare_feature) has not been
    /// called for `feature`.
    pub fn feature_vector(&self, feature: u32) -> &FeatureVector {
        if let Some(entry) = self.cache_filtered.get(&feature) {
            if let Some(vector) = &entry.vector {
                return vector;
            }
        }
        &self.thresholds.cache[&feature]
    }

    /// Commit a refinement: adjust its split for zero-weight examples,
    /// filter the feature's cached vector down to the examples covered by
    /// the extended rule, and update the coverage mask and statistics.
    pub fn filter_thresholds(&mut self, refinement: &mut Refinement, statistics: &mut SlotStatistics) {
        self.num_modifications += 1;
        self.num_covered_examples = refinement.num_covered;

        let feature = refinement.feature_index;
        let entry = self.cache_filtered.entry(feature).or_default();
        let vector: &FeatureVector = match &entry.vector {
            Some(vector) => vector,
            None => &self.thresholds.cache[&feature],
        };

        // Examples with zero weights were invisible to the search, so the
        // position separating covered from uncovered examples may differ
        // from the sampled-only one and must be adjusted first...
        if self.weights.has_zero_weights() && (refinement.previous - refinement.end).abs() > 1 {
            refinement.end =
                adjust_split(vector, refinement.end, refinement.previous, refinement.threshold);
        }

        let filtered = filter_current_vector(
            vector,
            refinement.start,
            refinement.end,
            refinement.comparator,
            refinement.covered,
            self.num_modifications,
            &mut self.coverage_mask,
            statistics,
            self.weights,
        );

        let entry = self.cache_filtered.entry(feature).or_default();
        entry.vector = Some(filtered);
        entry.num_conditions = self.num_modifications;
    }

    /// Apply the committed rule's prediction: bump the coverage count of
    /// every covered example and recompute the committed prediction.
    pub fn apply_prediction(&self, statistics: &mut SlotStatistics) {
        for i in 0..statistics.num_statistics() {
            if self.coverage_mask.is_covered(i) {
                statistics.increase_coverage_count(i);
            }
        }
        statistics.update_predictions();
    }

    /// Discard all filtered vectors and cover all examples again.
    pub fn reset_thresholds(&mut self) {
        self.num_modifications = 0;
        self.num_covered_examples = self.weights.num_non_zero_weights();
        self.cache_filtered.clear();
        self.coverage_mask.reset();
    }
}

// ============================================================================
// Split adjustment & filtering
// ============================================================================

/// Adjust the position separating covered from uncovered examples with
/// respect to the examples outside the current sub-sample.
///
/// Walks from `condition_end` toward `condition_previous` (exclusive) and
/// moves the position across every example whose value falls on the covered
/// side of `threshold`. Traversal is ascending when `condition_end` lies
/// below `condition_previous` and descending otherwise.
pub(crate) fn adjust_split(
    vector: &FeatureVector,
    condition_end: i64,
    condition_previous: i64,
    threshold: f32,
) -> i64 {
    let entries = vector.entries();
    let mut adjusted_position = condition_end;
    let ascending = condition_end < condition_previous;
    let direction: i64 = if ascending { 1 } else { -1 };
    let start = condition_end + direction;
    let num_steps = (start - condition_previous).abs();

    for i in 0..num_steps {
        let r = start + i * direction;
        let value = entries[r as usize].value;
        let adjust = if ascending {
            value <= threshold
        } else {
            value > threshold
        };

        if adjust {
            adjusted_position = r;
        } else {
            break;
        }
    }

    adjusted_position
}

/// Filter `vector` down to the examples covered after committing a
/// condition over the region `[condition_start, condition_end)` (normalized
/// for descending sweeps), updating the coverage mask and statistics along
/// the way. Returns the filtered vector; it never retains missing indices,
/// since missing examples fall out of coverage on the first condition that
/// touches their feature.
#[allow(clippy::too_many_arguments)]
fn filter_current_vector(
    vector: &FeatureVector,
    condition_start: i64,
    condition_end: i64,
    comparator: Comparator,
    covered: bool,
    num_conditions: u32,
    coverage_mask: &mut CoverageMask,
    statistics: &mut SlotStatistics,
    weights: &WeightVector,
) -> FeatureVector {
    let entries = vector.entries();
    let num_total = entries.len() as i64;
    let descending = condition_end < condition_start;
    let (start, end) = if descending {
        (condition_end + 1, condition_start + 1)
    } else {
        (condition_start, condition_end)
    };

    if covered {
        // Retain exactly the region and move the mask target so that only
        // its examples remain covered.
        coverage_mask.set_target(num_conditions);
        statistics.reset_covered_statistics();
        let mut filtered = Vec::with_capacity((end - start).max(0) as usize);

        for r in start..end {
            let entry = entries[r as usize];
            coverage_mask.set(entry.index, num_conditions);
            filtered.push(entry);
            statistics.update_covered_statistic(entry.index, weights.weight(entry.index), false);
        }

        FeatureVector::new(filtered, vec![])
    } else {
        // Discard the region: mark its examples with the new condition
        // count, which differs from the mask target and uncovers them.
        for r in start..end {
            let entry = entries[r as usize];
            coverage_mask.set(entry.index, num_conditions);
            statistics.update_covered_statistic(entry.index, weights.weight(entry.index), true);
        }

        let retained = num_total - (end - start);
        let mut filtered = Vec::with_capacity(retained.max(0) as usize);

        // A `!=` condition removes an interior span; everything on both
        // sides stays covered. Other comparators remove a span touching one
        // boundary of the vector, leaving a single range.
        if comparator == Comparator::Neq {
            filtered.extend_from_slice(&entries[..start as usize]);
            filtered.extend_from_slice(&entries[end as usize..]);
        } else if descending {
            filtered.extend_from_slice(&entries[..start as usize]);
        } else {
            filtered.extend_from_slice(&entries[end as usize..]);
        }

        // Missing examples cannot satisfy a value condition; they drop out
        // of coverage together with the discarded region.
        for &index in vector.missing_indices() {
            coverage_mask.set(index, num_conditions);
            statistics.update_covered_statistic(index, weights.weight(index), true);
        }

        FeatureVector::new(filtered, vec![])
    }
}
