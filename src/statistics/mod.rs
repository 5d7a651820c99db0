//! Per-time-slot coverage statistics.
//!
//! [`SlotStatistics`] is the mutable state that drives the search. For every
//! time slot it tracks the committed prediction (`prediction`, the number of
//! examples covered by at least one committed rule) and the prediction the
//! current sub-sample would produce if the rule being grown covered all of
//! it (`total_prediction`). For every example it tracks how many committed
//! rules cover it; examples with a non-zero coverage count contribute
//! nothing new and are skipped by all counter updates.
//!
//! A [`SlotStatisticsSubset`] is the scratch state of one refinement search:
//! it moves examples from the uncovered to the covered side as the sweep
//! adds them, and scores either side via the correlation evaluation.

mod evaluation;

pub use evaluation::{correlation_quality, CorrelationRuleEvaluation};

use crate::data::LabelMatrix;

// ============================================================================
// LabelIndices
// ============================================================================

/// The target indices a head may predict for: all of them, or a subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelIndices {
    /// All `n` targets, in order.
    Full(u32),
    /// An explicit list of target indices.
    Partial(Vec<u32>),
}

impl LabelIndices {
    /// Number of targets in the projection.
    pub fn num_labels(&self) -> usize {
        match self {
            Self::Full(n) => *n as usize,
            Self::Partial(indices) => indices.len(),
        }
    }

    /// Iterate the projected target indices.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (full, partial) = match self {
            Self::Full(n) => (Some(0..*n), None),
            Self::Partial(indices) => (None, Some(indices.iter().copied())),
        };
        full.into_iter().flatten().chain(partial.into_iter().flatten())
    }
}

// ============================================================================
// SlotStatistics
// ============================================================================

/// Per-slot prediction counters and per-example coverage counts.
#[derive(Debug, Clone)]
pub struct SlotStatistics {
    label_matrix: LabelMatrix,
    /// Number of committed rules covering each example.
    coverage_count: Vec<u32>,
    /// Committed per-slot prediction: covered distinct examples per slot.
    prediction: Vec<u32>,
    /// Per-slot prediction of the current sub-sample, as updated while
    /// installing sampled examples and filtering conditions.
    total_prediction: Vec<u32>,
}

impl SlotStatistics {
    /// Create statistics for the given label matrix. No rule has been
    /// committed yet, so all counters start at zero.
    pub fn new(label_matrix: LabelMatrix) -> Self {
        let num_examples = label_matrix.num_rows() as usize;
        let num_slots = label_matrix.num_time_slots() as usize;
        Self {
            label_matrix,
            coverage_count: vec![0; num_examples],
            prediction: vec![0; num_slots],
            total_prediction: vec![0; num_slots],
        }
    }

    /// Number of examples.
    #[inline]
    pub fn num_statistics(&self) -> u32 {
        self.coverage_count.len() as u32
    }

    /// Number of predicted targets.
    #[inline]
    pub fn num_labels(&self) -> u32 {
        self.label_matrix.num_cols()
    }

    /// The underlying label matrix.
    #[inline]
    pub fn label_matrix(&self) -> &LabelMatrix {
        &self.label_matrix
    }

    /// Per-slot ground-truth counts.
    #[inline]
    pub fn ground_truth(&self) -> &[u32] {
        self.label_matrix.values_by_time_slot()
    }

    /// The committed per-slot prediction vector.
    #[inline]
    pub fn predictions(&self) -> &[u32] {
        &self.prediction
    }

    /// How many committed rules cover example `index`.
    #[inline]
    pub fn coverage_count(&self, index: u32) -> u32 {
        self.coverage_count[index as usize]
    }

    /// Reset the sub-sample prediction to the committed prediction.
    ///
    /// Equivalent to [`reset_covered_statistics`](Self::reset_covered_statistics).
    pub fn reset_sampled_statistics(&mut self) {
        self.reset_covered_statistics();
    }

    /// Register a sampled example.
    ///
    /// Equivalent to [`update_covered_statistic`](Self::update_covered_statistic)
    /// with `remove == false`.
    pub fn add_sampled_statistic(&mut self, index: u32, weight: u32) {
        self.update_covered_statistic(index, weight, false);
    }

    /// Reset the sub-sample prediction to the committed prediction.
    pub fn reset_covered_statistics(&mut self) {
        self.total_prediction.copy_from_slice(&self.prediction);
    }

    /// Add (or remove) an example's contribution to the sub-sample
    /// prediction of its time slot.
    ///
    /// Already-covered examples contribute nothing new: a slot's predicted
    /// count is the number of covered distinct examples, so each example
    /// counts once regardless of weight.
    pub fn update_covered_statistic(&mut self, index: u32, _weight: u32, remove: bool) {
        if self.coverage_count[index as usize] == 0 {
            let slot = self.label_matrix.time_slot_of_example(index) as usize;
            // Wrapping: an example outside the sub-sample can be removed
            // without ever having been added.
            if remove {
                self.total_prediction[slot] = self.total_prediction[slot].wrapping_sub(1);
            } else {
                self.total_prediction[slot] = self.total_prediction[slot].wrapping_add(1);
            }
        }
    }

    /// Record that one more committed rule covers example `index`.
    pub fn increase_coverage_count(&mut self, index: u32) {
        self.coverage_count[index as usize] += 1;
    }

    /// Recompute the committed prediction from the coverage counts.
    ///
    /// Called once per committed rule.
    pub fn update_predictions(&mut self) {
        for slot in 0..self.label_matrix.num_time_slots() {
            let (start, end) = self.label_matrix.examples_in_time_slot(slot);
            let prediction = (start..end)
                .filter(|&i| self.coverage_count[i as usize] > 0)
                .count() as u32;
            self.prediction[slot as usize] = prediction;
        }
    }

    /// Create a search-scratch subset over the given target projection.
    pub fn create_subset<'a>(&'a self, label_indices: &LabelIndices) -> SlotStatisticsSubset<'a> {
        SlotStatisticsSubset {
            statistics: self,
            evaluation: CorrelationRuleEvaluation::new(label_indices.num_labels()),
            covered: self.prediction.clone(),
            uncovered: self.total_prediction.clone(),
            accumulated: None,
        }
    }
}

// ============================================================================
// SlotStatisticsSubset
// ============================================================================

/// Accumulated counter pair used to score nominal value groups against the
/// union of all groups seen so far.
#[derive(Debug, Clone)]
struct AccumulatedPredictions {
    covered: Vec<u32>,
    uncovered: Vec<u32>,
}

/// The per-search scratch counters of one refinement sweep.
#[derive(Debug, Clone)]
pub struct SlotStatisticsSubset<'a> {
    statistics: &'a SlotStatistics,
    evaluation: CorrelationRuleEvaluation,
    /// Prediction of the covered side: committed prediction plus the
    /// examples added so far.
    covered: Vec<u32>,
    /// Prediction of the uncovered complement: sub-sample prediction minus
    /// the examples added so far and minus missing examples.
    uncovered: Vec<u32>,
    accumulated: Option<AccumulatedPredictions>,
}

impl<'a> SlotStatisticsSubset<'a> {
    /// Register an example with a missing value for the swept feature.
    ///
    /// Missing examples are covered by no split value, so they leave the
    /// uncovered complement as well.
    pub fn add_to_missing(&mut self, index: u32, _weight: u32) {
        if self.statistics.coverage_count[index as usize] == 0 {
            let slot = self.statistics.label_matrix.time_slot_of_example(index) as usize;
            self.uncovered[slot] = self.uncovered[slot].wrapping_sub(1);
        }
    }

    /// Move an example to the covered side.
    pub fn add_to_subset(&mut self, index: u32, _weight: u32) {
        if self.statistics.coverage_count[index as usize] == 0 {
            let slot = self.statistics.label_matrix.time_slot_of_example(index) as usize;
            self.covered[slot] += 1;
            self.uncovered[slot] = self.uncovered[slot].wrapping_sub(1);

            if let Some(accumulated) = &mut self.accumulated {
                accumulated.covered[slot] += 1;
                accumulated.uncovered[slot] = accumulated.uncovered[slot].wrapping_sub(1);
            }
        }
    }

    /// Snapshot the counters into the accumulators (first call only) and
    /// reload them from the parent statistics.
    ///
    /// Used between the per-value groups of a nominal feature.
    pub fn reset_subset(&mut self) {
        if self.accumulated.is_none() {
            self.accumulated = Some(AccumulatedPredictions {
                covered: self.covered.clone(),
                uncovered: self.uncovered.clone(),
            });
        }

        self.covered.copy_from_slice(&self.statistics.prediction);
        self.uncovered
            .copy_from_slice(&self.statistics.total_prediction);
    }

    /// Score one of the four counter vectors against the ground truth and
    /// return the quality (non-finite if undefined).
    ///
    /// # Panics
    /// Panics if `accumulated` is requested before any
    /// [`reset_subset`](Self::reset_subset) call.
    pub fn calculate_prediction(&mut self, uncovered: bool, accumulated: bool) -> f64 {
        let predictions = if accumulated {
            let accumulated = self
                .accumulated
                .as_ref()
                .expect("accumulated prediction requested before reset_subset");
            if uncovered {
                &accumulated.uncovered
            } else {
                &accumulated.covered
            }
        } else if uncovered {
            &self.uncovered
        } else {
            &self.covered
        };

        self.evaluation
            .evaluate(predictions, self.statistics.ground_truth())
    }

    /// The predicted scores of the last evaluated candidate.
    pub fn scores(&self) -> &[f64] {
        self.evaluation.scores()
    }
}
