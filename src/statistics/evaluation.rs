//! Rule quality from per-slot prediction counts.
//!
//! A candidate rule turns into a per-time-slot vector of covered-example
//! counts. Its quality is the Pearson correlation between that vector and
//! the per-slot ground-truth counts, negated in absolute value so that
//! lower scores are better and both positively and negatively correlated
//! rules are rewarded.

/// Negated absolute Pearson correlation between `predictions` and
/// `ground_truth`.
///
/// Returns a non-finite value if either sequence has zero variance; callers
/// must reject such candidates.
pub fn correlation_quality(predictions: &[u32], ground_truth: &[u32]) -> f64 {
    debug_assert_eq!(predictions.len(), ground_truth.len());
    let mut x_sum = 0.0f64;
    let mut x_squared_sum = 0.0f64;
    let mut y_sum = 0.0f64;
    let mut y_squared_sum = 0.0f64;
    let mut product_sum = 0.0f64;

    for (&truth, &prediction) in ground_truth.iter().zip(predictions) {
        let x = f64::from(truth);
        let y = f64::from(prediction);
        x_sum += x;
        x_squared_sum += x * x;
        y_sum += y;
        y_squared_sum += y * y;
        product_sum += x * y;
    }

    let n = ground_truth.len() as f64;
    let numerator = n * product_sum - x_sum * y_sum;
    let denominator = (n * x_squared_sum - x_sum * x_sum).sqrt()
        * (n * y_squared_sum - y_sum * y_sum).sqrt();

    -(numerator / denominator).abs()
}

/// Calculates the predicted scores of candidate rules together with the
/// quality of the per-slot prediction counts they would produce.
///
/// The predicted score is the constant +1 per target: covering an example
/// adds one to its slot's predicted count.
#[derive(Debug, Clone)]
pub struct CorrelationRuleEvaluation {
    scores: Vec<f64>,
    quality: f64,
}

impl CorrelationRuleEvaluation {
    /// Create an evaluation for `num_labels` predicted targets.
    pub fn new(num_labels: usize) -> Self {
        Self {
            scores: vec![1.0; num_labels],
            quality: f64::INFINITY,
        }
    }

    /// Score `predictions` against `ground_truth`; stores and returns the
    /// quality.
    pub fn evaluate(&mut self, predictions: &[u32], ground_truth: &[u32]) -> f64 {
        self.quality = correlation_quality(predictions, ground_truth);
        self.quality
    }

    /// The constant predicted scores.
    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    /// The quality computed by the last [`evaluate`](Self::evaluate) call.
    pub fn quality(&self) -> f64 {
        self.quality
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_positive_correlation_scores_minus_one() {
        let quality = correlation_quality(&[2, 0, 2], &[2, 0, 2]);
        assert_relative_eq!(quality, -1.0, max_relative = 1e-9);
    }

    #[test]
    fn perfect_negative_correlation_scores_minus_one() {
        let quality = correlation_quality(&[0, 2, 0], &[2, 0, 2]);
        assert_relative_eq!(quality, -1.0, max_relative = 1e-9);
    }

    #[test]
    fn uncorrelated_sequences_score_near_zero() {
        let quality = correlation_quality(&[1, 2, 1, 2], &[3, 3, 4, 4]);
        assert_relative_eq!(quality, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn partial_correlation_matches_pearson() {
        // Pearson r of (1, 2, 3) vs (1, 2, 2) is sqrt(3)/2.
        let quality = correlation_quality(&[1, 2, 3], &[1, 2, 2]);
        assert_relative_eq!(quality, -(3.0f64.sqrt() / 2.0), max_relative = 1e-9);
    }

    #[test]
    fn zero_variance_is_not_finite() {
        assert!(!correlation_quality(&[1, 1, 1], &[2, 0, 2]).is_finite());
        assert!(!correlation_quality(&[2, 0, 2], &[1, 1, 1]).is_finite());
    }

    #[test]
    fn evaluation_stores_quality_and_unit_scores() {
        let mut evaluation = CorrelationRuleEvaluation::new(1);
        assert_eq!(evaluation.scores(), &[1.0]);

        let quality = evaluation.evaluate(&[1, 0], &[4, 2]);
        assert_relative_eq!(quality, -1.0, max_relative = 1e-9);
        assert_eq!(evaluation.quality(), quality);
    }
}
