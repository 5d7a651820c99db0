//! Exact search for the best refinement of a rule on one feature.
//!
//! The sweep walks the value-sorted feature vector in two passes: the
//! negative values in ascending order, then the non-negative values in
//! descending order. At every boundary between distinct values of
//! positive-weight examples it scores the condition covering the examples
//! added so far and the condition covering the complement. Two bridge
//! checks follow: one separating the implicit zero-valued examples from the
//! explicit ones, and, for numerical features, one separating the negative
//! values from everything else. Nominal features are swept with per-value
//! groups that reset the scratch counters between groups.

use crate::data::{FeatureVector, WeightVector};
use crate::model::Comparator;
use crate::statistics::{LabelIndices, SlotStatistics};
use crate::training::head::{EvaluatedHead, FullHeadRefinement};
use crate::utils::arithmetic_mean;

/// Emit `<=` conditions on numerical features.
pub(crate) const USE_LEQ: bool = true;

/// Emit `!=` conditions on nominal features.
pub(crate) const USE_NEQ: bool = false;

// ============================================================================
// Refinement
// ============================================================================

/// A candidate condition, the head it was scored with, and the span
/// bookkeeping the thresholds filter consumes.
///
/// `covered == false` means the condition selects the complement of the
/// `[start, end)` region of the swept vector. A refinement without a head
/// has quality positive infinity and never wins.
#[derive(Debug, Clone)]
pub struct Refinement {
    /// The feature the sweep ran on.
    pub feature_index: u32,
    /// The operator of the candidate condition.
    pub comparator: Comparator,
    /// The threshold of the candidate condition.
    pub threshold: f32,
    /// Whether `[start, end)` is the covered region (or its complement).
    pub covered: bool,
    /// Number of examples the condition covers, in the current sub-sample.
    pub num_covered: u32,
    /// First position of the condition's region (inclusive).
    pub start: i64,
    /// Last position of the condition's region (exclusive; may lie below
    /// `start` for descending sweeps).
    pub end: i64,
    /// The position of the last example added before the split point.
    pub previous: i64,
    /// The best head found for this feature, if any.
    pub head: Option<EvaluatedHead>,
}

impl Refinement {
    /// An empty refinement for `feature_index` (no head, quality +inf).
    pub fn empty(feature_index: u32) -> Self {
        Self {
            feature_index,
            comparator: Comparator::Gr,
            threshold: 0.0,
            covered: false,
            num_covered: 0,
            start: 0,
            end: 0,
            previous: 0,
            head: None,
        }
    }

    /// The quality of the refinement's head; +inf without a head.
    #[inline]
    pub fn quality(&self) -> f64 {
        self.head.as_ref().map_or(f64::INFINITY, |h| h.quality)
    }

    /// Whether this refinement strictly beats `other`.
    #[inline]
    pub fn is_better_than(&self, other: &Refinement) -> bool {
        self.head.is_some() && self.quality() < other.quality()
    }
}

// ============================================================================
// find_refinement
// ============================================================================

/// Sweep `feature_vector` for the best condition on `feature_index`.
///
/// `num_examples_total` is the number of positive-weight examples covered by
/// the rule grown so far; complements are counted against it.
/// `current_best` is the quality of the best head the rule has found on any
/// feature so far; only strictly better candidates are returned.
// Every `find_head` call site updates `best_quality` in lockstep; the final
// one is unread by construction.
#[allow(clippy::too_many_arguments, unused_assignments)]
pub fn find_refinement(
    feature_index: u32,
    feature_vector: &FeatureVector,
    nominal: bool,
    num_examples_total: u32,
    min_coverage: u32,
    current_best: Option<f64>,
    weights: &WeightVector,
    statistics: &SlotStatistics,
    label_indices: &LabelIndices,
) -> Refinement {
    let mut refinement = Refinement::empty(feature_index);
    let mut head_refinement = FullHeadRefinement::new();
    let mut best_quality = current_best;

    let entries = feature_vector.entries();
    let num_elements = entries.len() as i64;

    // Create a new, empty subset of the statistics...
    let mut subset = statistics.create_subset(label_indices);

    for &i in feature_vector.missing_indices() {
        subset.add_to_missing(i, weights.weight(i));
    }

    // In the following, we start by processing all examples with feature
    // values < 0...
    let mut num_examples: u32 = 0;
    let mut first_r: i64 = 0;
    let mut last_negative_r: i64 = -1;
    let mut previous_threshold: f32 = 0.0;
    let mut previous_r: i64 = 0;
    let mut r: i64 = 0;

    // Traverse examples with feature values < 0 in ascending order until the
    // first example with weight > 0 is encountered...
    while r < num_elements {
        let current_threshold = entries[r as usize].value;

        if current_threshold >= 0.0 {
            break;
        }

        last_negative_r = r;
        let i = entries[r as usize].index;
        let weight = weights.weight(i);

        if weight > 0 {
            subset.add_to_subset(i, weight);
            num_examples += 1;
            previous_threshold = current_threshold;
            previous_r = r;
            break;
        }

        r += 1;
    }

    let mut accumulated_num_examples = num_examples;

    // Traverse the remaining examples with feature values < 0 in ascending
    // order...
    if num_examples > 0 {
        r += 1;
        while r < num_elements {
            let current_threshold = entries[r as usize].value;

            if current_threshold >= 0.0 {
                break;
            }

            last_negative_r = r;
            let i = entries[r as usize].index;
            let weight = weights.weight(i);

            // Do only consider examples that are included in the current
            // sub-sample...
            if weight > 0 {
                // Split points between examples with the same feature value
                // must not be considered...
                if previous_threshold != current_threshold {
                    let num_covered = num_examples;

                    if num_covered >= min_coverage && (nominal || USE_LEQ) {
                        if let Some(quality) =
                            head_refinement.find_head(best_quality, &mut subset, false, false)
                        {
                            best_quality = Some(quality);
                            refinement.start = first_r;
                            refinement.end = r;
                            refinement.previous = previous_r;
                            refinement.num_covered = num_covered;
                            refinement.covered = true;

                            if nominal {
                                refinement.comparator = Comparator::Eq;
                                refinement.threshold = previous_threshold;
                            } else {
                                refinement.comparator = Comparator::Leq;
                                refinement.threshold =
                                    arithmetic_mean(previous_threshold, current_threshold);
                            }
                        }
                    }

                    let num_covered = num_examples_total - num_examples;

                    if num_covered >= min_coverage && (!nominal || USE_NEQ) {
                        if let Some(quality) =
                            head_refinement.find_head(best_quality, &mut subset, true, false)
                        {
                            best_quality = Some(quality);
                            refinement.start = first_r;
                            refinement.end = r;
                            refinement.previous = previous_r;
                            refinement.num_covered = num_covered;
                            refinement.covered = false;

                            if nominal {
                                refinement.comparator = Comparator::Neq;
                                refinement.threshold = previous_threshold;
                            } else {
                                refinement.comparator = Comparator::Gr;
                                refinement.threshold =
                                    arithmetic_mean(previous_threshold, current_threshold);
                            }
                        }
                    }

                    // The previous examples will not be covered by the next
                    // per-value condition of a nominal feature...
                    if nominal {
                        subset.reset_subset();
                        num_examples = 0;
                        first_r = r;
                    }
                }

                previous_threshold = current_threshold;
                previous_r = r;
                subset.add_to_subset(i, weight);
                num_examples += 1;
                accumulated_num_examples += 1;
            }

            r += 1;
        }

        // If the feature is nominal and the negative values do not all share
        // one value, or not all examples have been iterated yet, the final
        // per-value group must be evaluated as well...
        if nominal
            && num_examples > 0
            && (num_examples < accumulated_num_examples
                || accumulated_num_examples < num_examples_total)
        {
            let num_covered = num_examples;

            if num_covered >= min_coverage {
                if let Some(quality) =
                    head_refinement.find_head(best_quality, &mut subset, false, false)
                {
                    best_quality = Some(quality);
                    refinement.start = first_r;
                    refinement.end = last_negative_r + 1;
                    refinement.previous = previous_r;
                    refinement.num_covered = num_covered;
                    refinement.covered = true;
                    refinement.comparator = Comparator::Eq;
                    refinement.threshold = previous_threshold;
                }
            }

            let num_covered = num_examples_total - num_examples;

            if num_covered >= min_coverage && USE_NEQ {
                if let Some(quality) =
                    head_refinement.find_head(best_quality, &mut subset, true, false)
                {
                    best_quality = Some(quality);
                    refinement.start = first_r;
                    refinement.end = last_negative_r + 1;
                    refinement.previous = previous_r;
                    refinement.num_covered = num_covered;
                    refinement.covered = false;
                    refinement.comparator = Comparator::Neq;
                    refinement.threshold = previous_threshold;
                }
            }
        }

        // Reset the subset, as examples with feature value < 0 have been
        // processed...
        subset.reset_subset();
    }

    let previous_threshold_negative = previous_threshold;
    let previous_r_negative = previous_r;
    let accumulated_num_examples_negative = accumulated_num_examples;

    // We continue by processing all examples with feature values >= 0...
    num_examples = 0;
    first_r = num_elements - 1;
    r = first_r;

    // Traverse examples with feature values >= 0 in descending order until
    // the first example with weight > 0 is encountered...
    while r > last_negative_r {
        let i = entries[r as usize].index;
        let weight = weights.weight(i);

        if weight > 0 {
            subset.add_to_subset(i, weight);
            num_examples += 1;
            previous_threshold = entries[r as usize].value;
            previous_r = r;
            break;
        }

        r -= 1;
    }

    accumulated_num_examples = num_examples;

    // Traverse the remaining examples with feature values >= 0 in descending
    // order...
    if num_examples > 0 {
        r -= 1;
        while r > last_negative_r {
            let i = entries[r as usize].index;
            let weight = weights.weight(i);

            if weight > 0 {
                let current_threshold = entries[r as usize].value;

                // Split points between examples with the same feature value
                // must not be considered...
                if previous_threshold != current_threshold {
                    let num_covered = num_examples;

                    if num_covered >= min_coverage {
                        if let Some(quality) =
                            head_refinement.find_head(best_quality, &mut subset, false, false)
                        {
                            best_quality = Some(quality);
                            refinement.start = first_r;
                            refinement.end = r;
                            refinement.previous = previous_r;
                            refinement.num_covered = num_covered;
                            refinement.covered = true;

                            if nominal {
                                refinement.comparator = Comparator::Eq;
                                refinement.threshold = previous_threshold;
                            } else {
                                refinement.comparator = Comparator::Gr;
                                refinement.threshold =
                                    arithmetic_mean(current_threshold, previous_threshold);
                            }
                        }
                    }

                    let num_covered = num_examples_total - num_examples;
                    let complement_enabled = if nominal { USE_NEQ } else { USE_LEQ };

                    if num_covered >= min_coverage && complement_enabled {
                        if let Some(quality) =
                            head_refinement.find_head(best_quality, &mut subset, true, false)
                        {
                            best_quality = Some(quality);
                            refinement.start = first_r;
                            refinement.end = r;
                            refinement.previous = previous_r;
                            refinement.num_covered = num_covered;
                            refinement.covered = false;

                            if nominal {
                                refinement.comparator = Comparator::Neq;
                                refinement.threshold = previous_threshold;
                            } else {
                                refinement.comparator = Comparator::Leq;
                                refinement.threshold =
                                    arithmetic_mean(current_threshold, previous_threshold);
                            }
                        }
                    }

                    if nominal {
                        subset.reset_subset();
                        num_examples = 0;
                        first_r = r;
                    }
                }

                previous_threshold = current_threshold;
                previous_r = r;
                subset.add_to_subset(i, weight);
                num_examples += 1;
                accumulated_num_examples += 1;
            }

            r -= 1;
        }
    }

    // If the feature is nominal and the non-negative values iterated so far
    // do not all share one value, the final per-value group must be
    // evaluated as well...
    if nominal && num_examples > 0 && num_examples < accumulated_num_examples {
        let num_covered = num_examples;

        if num_covered >= min_coverage {
            if let Some(quality) = head_refinement.find_head(best_quality, &mut subset, false, false)
            {
                best_quality = Some(quality);
                refinement.start = first_r;
                refinement.end = last_negative_r;
                refinement.previous = previous_r;
                refinement.num_covered = num_covered;
                refinement.covered = true;
                refinement.comparator = Comparator::Eq;
                refinement.threshold = previous_threshold;
            }
        }

        let num_covered = num_examples_total - num_examples;

        if num_covered >= min_coverage && USE_NEQ {
            if let Some(quality) = head_refinement.find_head(best_quality, &mut subset, true, false)
            {
                best_quality = Some(quality);
                refinement.start = first_r;
                refinement.end = last_negative_r;
                refinement.previous = previous_r;
                refinement.num_covered = num_covered;
                refinement.covered = false;
                refinement.comparator = Comparator::Neq;
                refinement.threshold = previous_threshold;
            }
        }
    }

    let total_accumulated_num_examples =
        accumulated_num_examples_negative + accumulated_num_examples;

    // If fewer examples than the total have been iterated across both
    // passes, there exist examples with sparse, i.e. zero, feature values.
    // Conditions that separate them from the explicit values must be tested
    // explicitly...
    if total_accumulated_num_examples > 0 && total_accumulated_num_examples < num_examples_total {
        // For a nominal feature the subset must be reset once more so the
        // accumulated state includes all examples processed so far...
        if nominal {
            subset.reset_subset();
            first_r = num_elements - 1;
        }

        let num_covered = if nominal {
            total_accumulated_num_examples
        } else {
            accumulated_num_examples
        };

        if num_covered >= min_coverage && (!nominal || USE_NEQ) {
            // `f > previous_threshold / 2` (or `f != 0` for a nominal
            // feature) covers the explicit values...
            if let Some(quality) =
                head_refinement.find_head(best_quality, &mut subset, false, nominal)
            {
                best_quality = Some(quality);
                refinement.start = first_r;
                refinement.covered = true;
                refinement.num_covered = num_covered;

                if nominal {
                    refinement.end = -1;
                    refinement.previous = -1;
                    refinement.comparator = Comparator::Neq;
                    refinement.threshold = 0.0;
                } else {
                    refinement.end = last_negative_r;
                    refinement.previous = previous_r;
                    refinement.comparator = Comparator::Gr;
                    refinement.threshold = previous_threshold * 0.5;
                }
            }
        }

        let num_covered = num_examples_total
            - if nominal {
                total_accumulated_num_examples
            } else {
                accumulated_num_examples
            };

        if num_covered >= min_coverage && (nominal || USE_LEQ) {
            // `f <= previous_threshold / 2` (or `f == 0`) covers the sparse
            // zeros...
            if let Some(quality) =
                head_refinement.find_head(best_quality, &mut subset, true, nominal)
            {
                best_quality = Some(quality);
                refinement.start = first_r;
                refinement.covered = false;
                refinement.num_covered = num_covered;

                if nominal {
                    refinement.end = -1;
                    refinement.previous = -1;
                    refinement.comparator = Comparator::Eq;
                    refinement.threshold = 0.0;
                } else {
                    refinement.end = last_negative_r;
                    refinement.previous = previous_r;
                    refinement.comparator = Comparator::Leq;
                    refinement.threshold = previous_threshold * 0.5;
                }
            }
        }
    }

    // For a numerical feature with both negative values and other examples,
    // conditions separating the negative values from the rest can only be
    // evaluated now that the smallest non-negative value is known...
    if !nominal
        && accumulated_num_examples_negative > 0
        && accumulated_num_examples_negative < num_examples_total
    {
        let separates_from_sparse = total_accumulated_num_examples < num_examples_total;
        let num_covered = accumulated_num_examples_negative;

        if num_covered >= min_coverage && USE_LEQ {
            if let Some(quality) = head_refinement.find_head(best_quality, &mut subset, false, true)
            {
                best_quality = Some(quality);
                refinement.start = 0;
                refinement.end = last_negative_r + 1;
                refinement.previous = previous_r_negative;
                refinement.num_covered = num_covered;
                refinement.covered = true;
                refinement.comparator = Comparator::Leq;

                refinement.threshold = if separates_from_sparse {
                    // The condition separates a negative value from a sparse
                    // zero.
                    previous_threshold_negative * 0.5
                } else {
                    // The condition separates a negative value from a
                    // positive one.
                    arithmetic_mean(previous_threshold_negative, previous_threshold)
                };
            }
        }

        let num_covered = num_examples_total - accumulated_num_examples_negative;

        if num_covered >= min_coverage {
            if let Some(quality) = head_refinement.find_head(best_quality, &mut subset, true, true)
            {
                best_quality = Some(quality);
                refinement.start = 0;
                refinement.end = last_negative_r + 1;
                refinement.previous = previous_r_negative;
                refinement.num_covered = num_covered;
                refinement.covered = false;
                refinement.comparator = Comparator::Gr;

                refinement.threshold = if separates_from_sparse {
                    previous_threshold_negative * 0.5
                } else {
                    arithmetic_mean(previous_threshold_negative, previous_threshold)
                };
            }
        }
    }

    refinement.head = head_refinement.poll_head();
    refinement
}
