//! Top-down greedy rule induction.
//!
//! One rule is grown condition by condition: every iteration samples a set
//! of candidate features, sweeps each of them for its best refinement in
//! parallel, and commits the globally best refinement. The parallel region
//! is read-only over shared state; the winning candidate is picked by a
//! sequential reduction in feature-iteration order after the join, so ties
//! resolve by that order and the result is independent of the worker count.

use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::data::{FeatureMatrix, WeightVector};
use crate::model::{Condition, Head, RuleListBuilder};
use crate::statistics::{LabelIndices, SlotStatistics};
use crate::training::refinement::{find_refinement, Refinement};
use crate::training::sampling::FeatureSampling;
use crate::training::thresholds::ExactThresholds;

/// Grows one rule at a time by greedy refinement.
#[derive(Debug, Clone, Copy)]
pub struct TopDownRuleInduction {
    min_support: f32,
    max_conditions: i32,
}

impl TopDownRuleInduction {
    /// Create an induction with the given coverage floor and condition cap.
    ///
    /// `min_support` is the fraction of training examples a condition must
    /// keep covered; `max_conditions == -1` leaves the rule body unbounded.
    pub fn new(min_support: f32, max_conditions: i32) -> Self {
        Self {
            min_support,
            max_conditions,
        }
    }

    /// Induce a single rule.
    ///
    /// Returns `(true, quality)` if a rule strictly better than
    /// `current_quality` was found, committed to the statistics, and added
    /// to the builder; `(false, current_quality)` otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn induce_rule<F: FeatureMatrix + Sync>(
        &self,
        pool: &rayon::ThreadPool,
        thresholds: &mut ExactThresholds<'_, F>,
        statistics: &mut SlotStatistics,
        label_indices: &LabelIndices,
        weights: &WeightVector,
        feature_sampling: &FeatureSampling,
        rng: &mut Xoshiro256PlusPlus,
        builder: &mut RuleListBuilder,
        current_quality: f64,
    ) -> (bool, f64) {
        let num_examples = thresholds.num_examples();
        let num_features = thresholds.num_features();
        let min_coverage = (self.min_support * num_examples as f32) as u32;

        let mut subset = thresholds.create_subset(weights, statistics);
        let mut conditions: Vec<Condition> = Vec::new();
        let mut best_refinement: Option<Refinement> = None;
        // Quality of the best head found so far; candidates must beat it.
        let mut best_quality: Option<f64> = None;
        let mut num_conditions: u32 = 0;
        let mut found_refinement = true;

        while found_refinement
            && (self.max_conditions == -1 || (num_conditions as i32) < self.max_conditions)
        {
            found_refinement = false;

            let feature_indices = feature_sampling.sample(num_features, rng);

            // Fetch, sort, and refilter sequentially; the parallel sweep
            // below only reads.
            for &feature in &feature_indices {
                subset.prepare_feature(feature);
            }

            let num_covered_examples = subset.num_covered_examples();
            let subset_ref = &subset;
            let statistics_ref: &SlotStatistics = statistics;

            let candidates: Vec<Refinement> = pool.install(|| {
                feature_indices
                    .par_iter()
                    .map(|&feature| {
                        find_refinement(
                            feature,
                            subset_ref.feature_vector(feature),
                            subset_ref.is_nominal(feature),
                            num_covered_examples,
                            min_coverage,
                            best_quality,
                            weights,
                            statistics_ref,
                            label_indices,
                        )
                    })
                    .collect()
            });

            // Sequential reduction in feature-iteration order.
            for candidate in candidates {
                let better = match &best_refinement {
                    None => candidate.head.is_some(),
                    Some(best) => candidate.is_better_than(best),
                };
                if better {
                    best_refinement = Some(candidate);
                    found_refinement = true;
                }
            }

            if found_refinement {
                let best = best_refinement
                    .as_mut()
                    .expect("a refinement was just found");
                best_quality = best.head.as_ref().map(|head| head.quality);

                subset.filter_thresholds(best, statistics);
                conditions.push(Condition::new(
                    best.feature_index,
                    best.comparator,
                    best.threshold,
                ));
                num_conditions += 1;
            }
        }

        // No useful condition could be found; this is the case e.g. when all
        // examples share the same values for the considered features.
        let Some(best) = best_refinement else {
            return (false, current_quality);
        };
        let Some(head) = best.head else {
            return (false, current_quality);
        };

        if head.quality < current_quality {
            subset.apply_prediction(statistics);
            builder.add_rule(conditions, Head { scores: head.scores });
            (true, head.quality)
        } else {
            (false, current_quality)
        }
    }
}
