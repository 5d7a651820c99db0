//! End-to-end rule induction scenarios.

use approx::assert_relative_eq;

use syndrule::data::{DenseFeatureMatrix, FeatureMatrix, LabelMatrix, NominalMask};
use syndrule::model::{Comparator, RuleList};
use syndrule::statistics::SlotStatistics;
use syndrule::training::{
    FeatureSampling, InstanceSampling, PredictionVisitor, RuleListConfig, RuleListTrainer,
    SinglePartition, StoppingAction, StoppingCriterion, StoppingResult, Verbosity,
};

/// Records everything the trainer reports.
#[derive(Default)]
struct RecordingVisitor {
    predictions: Vec<Vec<u32>>,
    ground_truth: Option<Vec<u32>>,
}

impl PredictionVisitor for RecordingVisitor {
    fn visit_prediction(&mut self, predictions: &[u32]) {
        self.predictions.push(predictions.to_vec());
    }

    fn visit_ground_truth(&mut self, ground_truth: &[u32]) {
        self.ground_truth = Some(ground_truth.to_vec());
    }
}

fn silent_config() -> RuleListConfig {
    RuleListConfig {
        verbosity: Verbosity::Silent,
        ..RuleListConfig::default()
    }
}

fn trainer(config: RuleListConfig) -> RuleListTrainer {
    RuleListTrainer::new(config).unwrap()
}

#[test]
fn perfect_numerical_rule() {
    // Three slots of two examples; the feature marks slots 0 and 2, whose
    // ground-truth counts are high.
    let features = DenseFeatureMatrix::from_vec(vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0], 6, 1);
    let labels =
        LabelMatrix::from_rows(&[(0, 2), (0, 2), (1, 0), (1, 0), (2, 2), (2, 2)]).unwrap();

    let mut config = silent_config();
    config.min_support = 0.1;
    config.max_conditions = 1;

    let mut visitor = RecordingVisitor::default();
    let model = trainer(config)
        .train_with_visitor(&features, &labels, &NominalMask::none(), &mut visitor)
        .unwrap();

    assert_eq!(model.num_rules(), 1);
    let rule = &model.rules()[0];
    assert_eq!(rule.body.len(), 1);
    assert_eq!(rule.body[0].feature, 0);
    assert_eq!(rule.body[0].comparator, Comparator::Gr);
    assert_relative_eq!(rule.body[0].threshold, 0.5);
    assert_eq!(rule.head.scores, vec![1.0]);
    assert_eq!(rule.to_string(), "f0 > 0.5 → +1");

    assert_eq!(visitor.predictions, vec![vec![2, 0, 2]]);
    assert_eq!(visitor.ground_truth, Some(vec![2, 0, 2]));
}

#[test]
fn nominal_feature_splits_on_equality() {
    // The explicit value 1 marks slot 0; the implicit zero class marks
    // slot 1, whose low count correlates negatively. The best condition is
    // the equality test on the zero class.
    let features = DenseFeatureMatrix::from_vec(vec![1.0, 1.0, 0.0, 0.0], 4, 1);
    let labels = LabelMatrix::from_rows(&[(0, 2), (0, 2), (1, 0), (1, 0)]).unwrap();

    let mut visitor = RecordingVisitor::default();
    let model = trainer(silent_config())
        .train_with_visitor(
            &features,
            &labels,
            &NominalMask::from_indices([0]),
            &mut visitor,
        )
        .unwrap();

    assert_eq!(model.num_rules(), 1);
    let rule = &model.rules()[0];
    assert_eq!(rule.body.len(), 1);
    assert_eq!(rule.body[0].comparator, Comparator::Eq);
    assert_eq!(rule.body[0].threshold, 0.0);
    assert_eq!(visitor.predictions, vec![vec![0, 2]]);
}

#[test]
fn nominal_feature_splits_between_explicit_values() {
    let features = DenseFeatureMatrix::from_vec(vec![1.0, 1.0, 2.0, 2.0], 4, 1);
    let labels = LabelMatrix::from_rows(&[(0, 2), (0, 2), (1, 0), (1, 0)]).unwrap();

    let model = trainer(silent_config())
        .train(&features, &labels, &NominalMask::All(true))
        .unwrap();

    assert_eq!(model.num_rules(), 1);
    let rule = &model.rules()[0];
    assert_eq!(rule.body[0].comparator, Comparator::Eq);
    assert_eq!(rule.body[0].threshold, 2.0);
}

#[test]
fn sparse_zeros_are_separated_from_explicit_values() {
    // The explicit values all coincide, so the only usable condition is the
    // bridge between them and the implicit zeros.
    let features = DenseFeatureMatrix::from_vec(vec![0.0, 0.0, 3.0, 3.0], 4, 1);
    let labels = LabelMatrix::from_rows(&[(0, 0), (0, 0), (1, 2), (1, 2)]).unwrap();

    let mut visitor = RecordingVisitor::default();
    let model = trainer(silent_config())
        .train_with_visitor(&features, &labels, &NominalMask::none(), &mut visitor)
        .unwrap();

    assert_eq!(model.num_rules(), 1);
    let rule = &model.rules()[0];
    assert_eq!(rule.body[0].comparator, Comparator::Gr);
    assert_relative_eq!(rule.body[0].threshold, 1.5);

    // The rule covers exactly the two explicit examples.
    let raw = [0.0, 0.0, 3.0, 3.0];
    let covered: Vec<usize> = (0..4)
        .filter(|&i| rule.covers(|_| Some(raw[i])))
        .collect();
    assert_eq!(covered, vec![2, 3]);
    assert_eq!(visitor.predictions, vec![vec![0, 2]]);
}

#[test]
fn missing_values_and_constant_ground_truth_yield_no_rule() {
    // Example 2's value is missing, the rest are constant, and the
    // ground-truth counts have zero variance: every candidate quality is
    // undefined and no rule is induced.
    let features = DenseFeatureMatrix::from_vec(vec![1.0, 1.0, f32::NAN, 1.0], 4, 1);
    let labels = LabelMatrix::from_rows(&[(0, 1), (0, 1), (1, 1), (1, 1)]).unwrap();

    let mut visitor = RecordingVisitor::default();
    let model = trainer(silent_config())
        .train_with_visitor(&features, &labels, &NominalMask::none(), &mut visitor)
        .unwrap();

    assert_eq!(model.num_rules(), 0);
    assert!(visitor.predictions.is_empty());
    assert_eq!(visitor.ground_truth, Some(vec![1, 1]));
}

#[test]
fn all_zero_features_yield_no_rule() {
    let features = DenseFeatureMatrix::from_vec(vec![0.0; 4], 4, 1);
    let labels = LabelMatrix::from_rows(&[(0, 2), (0, 2), (1, 0), (1, 0)]).unwrap();

    let model = trainer(silent_config())
        .train(&features, &labels, &NominalMask::none())
        .unwrap();
    assert_eq!(model.num_rules(), 0);
}

#[test]
fn single_example_admits_no_rule() {
    let features = DenseFeatureMatrix::from_vec(vec![1.0], 1, 1);
    let labels = LabelMatrix::from_rows(&[(0, 1)]).unwrap();

    // A single slot has zero variance, so no quality is ever defined.
    let model = trainer(silent_config())
        .train(&features, &labels, &NominalMask::none())
        .unwrap();
    assert_eq!(model.num_rules(), 0);
}

// ============================================================================
// Multi-rule induction & stopping
// ============================================================================

/// Two informative features; each rule covers one high-count slot, and the
/// second rule strictly improves the correlation of the committed
/// prediction.
fn two_rule_setup() -> (DenseFeatureMatrix, LabelMatrix) {
    let features = DenseFeatureMatrix::from_vec(
        vec![
            1.0, 0.0, //
            1.0, 0.0, //
            0.0, 1.0, //
            0.0, 1.0, //
            0.0, 0.0, //
            0.0, 0.0,
        ],
        6,
        2,
    );
    let labels =
        LabelMatrix::from_rows(&[(0, 2), (0, 2), (1, 2), (1, 2), (2, 0), (2, 0)]).unwrap();
    (features, labels)
}

#[test]
fn rules_are_added_while_quality_strictly_improves() {
    let (features, labels) = two_rule_setup();

    let mut visitor = RecordingVisitor::default();
    let model = trainer(silent_config())
        .train_with_visitor(&features, &labels, &NominalMask::none(), &mut visitor)
        .unwrap();

    assert_eq!(model.num_rules(), 2);
    assert_eq!(model.rules()[0].body[0].feature, 0);
    assert_eq!(model.rules()[1].body[0].feature, 1);
    assert_eq!(
        visitor.predictions,
        vec![vec![2, 0, 0], vec![2, 2, 0]],
        "each committed rule reports the updated prediction"
    );
}

/// Requests a model truncation at a fixed rule count, then lets training
/// continue.
struct StoreAt {
    at: u32,
    fired: bool,
}

impl StoppingCriterion for StoreAt {
    fn test(
        &mut self,
        _partition: &SinglePartition,
        _statistics: &SlotStatistics,
        num_rules: u32,
    ) -> StoppingResult {
        if !self.fired && num_rules >= self.at {
            self.fired = true;
            StoppingResult {
                action: StoppingAction::StoreStop,
                num_rules,
            }
        } else {
            StoppingResult::keep_going()
        }
    }
}

#[test]
fn store_stop_truncates_the_model_but_not_training() {
    let (features, labels) = two_rule_setup();

    let mut visitor = RecordingVisitor::default();
    let model = trainer(silent_config())
        .train_with_criteria(
            &features,
            &labels,
            &NominalMask::none(),
            &mut visitor,
            vec![Box::new(StoreAt { at: 1, fired: false })],
        )
        .unwrap();

    // Training kept going (two predictions were reported), but the
    // persisted model was truncated at the latched rule count.
    assert_eq!(visitor.predictions.len(), 2);
    assert_eq!(model.num_rules(), 1);
    assert_eq!(model.rules()[0].body[0].feature, 0);
}

#[test]
fn max_rules_limits_training() {
    let (features, labels) = two_rule_setup();

    let mut config = silent_config();
    config.max_rules = 1;

    let mut visitor = RecordingVisitor::default();
    let model = trainer(config)
        .train_with_visitor(&features, &labels, &NominalMask::none(), &mut visitor)
        .unwrap();

    assert_eq!(model.num_rules(), 1);
    assert_eq!(visitor.predictions.len(), 1);
}

// ============================================================================
// Determinism & consistency
// ============================================================================

/// A deterministic dataset mixing negatives, sparse zeros, a missing value,
/// and a nominal feature.
fn mixed_dataset() -> (DenseFeatureMatrix, Vec<f32>, LabelMatrix, NominalMask) {
    let num_rows = 24;
    let num_features = 3;
    let mut values = vec![0.0f32; num_rows * num_features];

    for row in 0..num_rows {
        // Feature 0: negative for the first third, zero for the middle,
        // positive for the rest.
        values[row * num_features] = match row / 8 {
            0 => -(row as f32 + 1.0),
            1 => 0.0,
            _ => row as f32 - 10.0,
        };
        // Feature 1: nominal with three classes, one of them implicit zero.
        values[row * num_features + 1] = (row % 3) as f32;
        // Feature 2: noisy numerical values.
        values[row * num_features + 2] = ((row * 7) % 11) as f32 - 5.0;
    }
    // One missing value.
    values[5 * num_features + 2] = f32::NAN;

    let rows: Vec<(u32, u32)> = (0..num_rows)
        .map(|row| {
            let slot = (row / 4) as u32;
            let count = [4, 1, 0, 3, 2, 4][slot as usize];
            (slot, count)
        })
        .collect();
    let labels = LabelMatrix::from_rows(&rows).unwrap();

    (
        DenseFeatureMatrix::from_vec(values.clone(), num_rows, num_features),
        values,
        labels,
        NominalMask::from_indices([1]),
    )
}

#[test]
fn identical_seeds_produce_identical_models() {
    let (features, _, labels, nominal) = mixed_dataset();

    let mut config = silent_config();
    config.min_support = 0.1;
    config.instance_sampling = InstanceSampling::Random { sample_size: 0.75 };
    config.feature_sampling = FeatureSampling::Random { sample_size: 0.0 };
    config.seed = 99;

    let model_a = trainer(config.clone())
        .train(&features, &labels, &nominal)
        .unwrap();

    config.num_threads = 4;
    let model_b = trainer(config.clone())
        .train(&features, &labels, &nominal)
        .unwrap();

    assert_eq!(
        model_a.to_json().unwrap(),
        model_b.to_json().unwrap(),
        "models must not depend on the worker count"
    );
}

#[test]
fn committed_predictions_match_the_model_reapplied_to_raw_features() {
    let (features, raw, labels, nominal) = mixed_dataset();
    let num_features = features.num_features() as usize;

    let mut config = silent_config();
    config.min_support = 0.1;

    let mut visitor = RecordingVisitor::default();
    let model = trainer(config)
        .train_with_visitor(&features, &labels, &nominal, &mut visitor)
        .unwrap();

    assert!(
        !model.rules().is_empty(),
        "the mixed dataset must admit at least one rule"
    );
    let final_prediction = visitor.predictions.last().unwrap().clone();

    // Re-apply the persisted rules to the raw matrix and recount covered
    // examples per slot.
    let mut counts = vec![0u32; labels.num_time_slots() as usize];
    for row in 0..labels.num_rows() {
        let covered = model.rules().iter().any(|rule| {
            rule.covers(|feature| {
                let value = raw[row as usize * num_features + feature as usize];
                if value.is_nan() {
                    None
                } else {
                    Some(value)
                }
            })
        });
        if covered {
            counts[labels.time_slot_of_example(row) as usize] += 1;
        }
    }

    assert_eq!(counts, final_prediction);
}

#[test]
fn models_survive_a_json_round_trip() {
    let (features, labels) = two_rule_setup();

    let model = trainer(silent_config())
        .train(&features, &labels, &NominalMask::none())
        .unwrap();

    let json = model.to_json().unwrap();
    let restored = RuleList::from_json(&json).unwrap();
    assert_eq!(restored, model);
}
