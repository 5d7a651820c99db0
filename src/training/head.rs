//! Head refinement.
//!
//! During the split sweep, every candidate condition is scored by asking the
//! statistics subset for the quality of the prediction vector the condition
//! would produce. The [`FullHeadRefinement`] keeps the best head found so
//! far and only replaces it when a candidate is strictly better, so ties
//! resolve in favor of the earlier-discovered candidate.

use crate::statistics::SlotStatisticsSubset;

/// A candidate head together with the quality of its prediction vector.
///
/// Lower quality is better; the quality of a missing head is positive
/// infinity.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedHead {
    /// The predicted score per target.
    pub scores: Vec<f64>,
    /// The overall quality score (negated absolute correlation).
    pub quality: f64,
}

/// Finds the best head predicting for the full target set.
#[derive(Debug, Default)]
pub struct FullHeadRefinement {
    best: Option<EvaluatedHead>,
}

impl FullHeadRefinement {
    /// Create a head refinement with no head found yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Score the candidate selected by `uncovered`/`accumulated` and keep it
    /// iff it is strictly better than `current_best` (or `current_best` is
    /// `None`).
    ///
    /// Returns the candidate's quality when it became the new best head,
    /// `None` otherwise. Candidates with an undefined (non-finite) quality
    /// are always rejected.
    pub fn find_head(
        &mut self,
        current_best: Option<f64>,
        subset: &mut SlotStatisticsSubset<'_>,
        uncovered: bool,
        accumulated: bool,
    ) -> Option<f64> {
        let quality = subset.calculate_prediction(uncovered, accumulated);

        if !quality.is_finite() {
            return None;
        }
        if current_best.is_some_and(|best| quality >= best) {
            return None;
        }

        self.best = Some(EvaluatedHead {
            scores: subset.scores().to_vec(),
            quality,
        });
        Some(quality)
    }

    /// Yield ownership of the best head found, if any.
    pub fn poll_head(&mut self) -> Option<EvaluatedHead> {
        self.best.take()
    }
}
