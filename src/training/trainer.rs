//! Sequential rule-model induction.
//!
//! The trainer wires everything together: it builds the statistics from the
//! label matrix, optionally installs a default rule, then keeps asking the
//! top-down induction for one more rule until a stopping criterion fires or
//! no rule improves the model. Committed per-slot predictions are reported
//! through a [`PredictionVisitor`] after every rule, and the ground truth
//! once at the end.
//!
//! # Example
//!
//! ```
//! use syndrule::data::{DenseFeatureMatrix, LabelMatrix, NominalMask};
//! use syndrule::training::{RuleListConfig, RuleListTrainer, Verbosity};
//!
//! let features = DenseFeatureMatrix::from_vec(
//!     vec![1.0, 1.0, 0.0, 0.0, 1.0, 1.0],
//!     6,
//!     1,
//! );
//! let labels = LabelMatrix::from_rows(
//!     &[(0, 2), (0, 2), (1, 0), (1, 0), (2, 2), (2, 2)],
//! ).unwrap();
//!
//! let config = RuleListConfig {
//!     verbosity: Verbosity::Silent,
//!     ..RuleListConfig::default()
//! };
//! let trainer = RuleListTrainer::new(config).unwrap();
//! let model = trainer.train(&features, &labels, &NominalMask::none()).unwrap();
//! assert_eq!(model.num_rules(), 1);
//! ```

use std::time::Duration;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::{FeatureMatrix, LabelMatrix, NominalMask};
use crate::model::{Head, RuleList, RuleListBuilder};
use crate::statistics::{LabelIndices, SlotStatistics};
use crate::training::induction::TopDownRuleInduction;
use crate::training::logger::{TrainingLogger, Verbosity};
use crate::training::sampling::{FeatureSampling, InstanceSampling, SinglePartition};
use crate::training::stopping::{
    test_stopping_criteria, SizeStoppingCriterion, StoppingAction, StoppingCriterion,
    TimeStoppingCriterion,
};
use crate::training::thresholds::ExactThresholds;

// ============================================================================
// Configuration
// ============================================================================

/// Errors raised for invalid configurations or inconsistent inputs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TrainingError {
    #[error("min_support must be in [0, 1), got {0}")]
    InvalidMinSupport(f32),

    #[error("max_conditions must be -1 or at least 1, got {0}")]
    InvalidMaxConditions(i32),

    #[error("num_threads must be at least 1, got {0}")]
    InvalidNumThreads(u32),

    #[error("max_rules must be -1 or positive, got {0}")]
    InvalidMaxRules(i32),

    #[error("time_limit must be -1 or positive, got {0}")]
    InvalidTimeLimit(i32),

    #[error("instance sample_size must be in (0, 1), got {0}")]
    InvalidInstanceSampleSize(f32),

    #[error("feature sample_size must be in [0, 1), got {0}")]
    InvalidFeatureSampleSize(f32),

    #[error("feature matrix has {features} rows but label matrix has {labels}")]
    ExampleCountMismatch { features: u32, labels: u32 },

    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

/// Configuration of the rule-list trainer.
#[derive(Debug, Clone)]
pub struct RuleListConfig {
    /// Minimum fraction of training examples a rule must cover, in [0, 1).
    pub min_support: f32,
    /// Maximum number of conditions per rule body; -1 disables the cap.
    pub max_conditions: i32,
    /// Number of parallel workers for the refinement search.
    pub num_threads: u32,
    /// Maximum number of rules, including the default rule; -1 disables.
    pub max_rules: i32,
    /// Wall-clock training budget in seconds; -1 disables.
    pub time_limit: i32,
    /// Instance sub-sampling strategy per rule.
    pub instance_sampling: InstanceSampling,
    /// Feature sub-sampling strategy per refinement iteration.
    pub feature_sampling: FeatureSampling,
    /// Whether to install a default rule predicting zero.
    pub default_rule: bool,
    /// Seed of the RNG stream used by the sampling components.
    pub seed: u64,
    /// How much the trainer logs.
    pub verbosity: Verbosity,
}

impl Default for RuleListConfig {
    fn default() -> Self {
        Self {
            min_support: 0.0,
            max_conditions: -1,
            num_threads: 1,
            max_rules: 1000,
            time_limit: -1,
            instance_sampling: InstanceSampling::None,
            feature_sampling: FeatureSampling::None,
            default_rule: false,
            seed: 1,
            verbosity: Verbosity::Info,
        }
    }
}

impl RuleListConfig {
    /// Check the configuration for contract violations.
    pub fn validate(&self) -> Result<(), TrainingError> {
        if !(0.0..1.0).contains(&self.min_support) {
            return Err(TrainingError::InvalidMinSupport(self.min_support));
        }
        if self.max_conditions != -1 && self.max_conditions < 1 {
            return Err(TrainingError::InvalidMaxConditions(self.max_conditions));
        }
        if self.num_threads == 0 {
            return Err(TrainingError::InvalidNumThreads(self.num_threads));
        }
        if self.max_rules != -1 && self.max_rules <= 0 {
            return Err(TrainingError::InvalidMaxRules(self.max_rules));
        }
        if self.time_limit != -1 && self.time_limit <= 0 {
            return Err(TrainingError::InvalidTimeLimit(self.time_limit));
        }
        if let InstanceSampling::Random { sample_size } = self.instance_sampling {
            if !(sample_size > 0.0 && sample_size < 1.0) {
                return Err(TrainingError::InvalidInstanceSampleSize(sample_size));
            }
        }
        if let FeatureSampling::Random { sample_size } = self.feature_sampling {
            if !(0.0..1.0).contains(&sample_size) {
                return Err(TrainingError::InvalidFeatureSampleSize(sample_size));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PredictionVisitor
// ============================================================================

/// Receives the committed per-slot prediction vector after every rule and
/// the ground-truth vector once at the end of training.
pub trait PredictionVisitor {
    /// Called after each committed rule.
    fn visit_prediction(&mut self, predictions: &[u32]);

    /// Called once when training finishes.
    fn visit_ground_truth(&mut self, ground_truth: &[u32]);
}

/// A visitor that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpVisitor;

impl PredictionVisitor for NoOpVisitor {
    fn visit_prediction(&mut self, _predictions: &[u32]) {}

    fn visit_ground_truth(&mut self, _ground_truth: &[u32]) {}
}

// ============================================================================
// RuleListTrainer
// ============================================================================

/// Drives sequential rule-model induction.
pub struct RuleListTrainer {
    config: RuleListConfig,
    logger: TrainingLogger,
}

impl RuleListTrainer {
    /// Create a trainer; the configuration is validated up front.
    pub fn new(config: RuleListConfig) -> Result<Self, TrainingError> {
        config.validate()?;
        let logger = TrainingLogger::new(config.verbosity);
        Ok(Self { config, logger })
    }

    /// The trainer's configuration.
    pub fn config(&self) -> &RuleListConfig {
        &self.config
    }

    /// Train a rule list.
    pub fn train<F: FeatureMatrix + Sync>(
        &self,
        features: &F,
        labels: &LabelMatrix,
        nominal_mask: &NominalMask,
    ) -> Result<RuleList, TrainingError> {
        self.train_with_visitor(features, labels, nominal_mask, &mut NoOpVisitor)
    }

    /// Train a rule list, reporting predictions through `visitor`.
    pub fn train_with_visitor<F: FeatureMatrix + Sync>(
        &self,
        features: &F,
        labels: &LabelMatrix,
        nominal_mask: &NominalMask,
        visitor: &mut dyn PredictionVisitor,
    ) -> Result<RuleList, TrainingError> {
        self.train_with_criteria(features, labels, nominal_mask, visitor, Vec::new())
    }

    /// Train a rule list with additional stopping criteria on top of the
    /// configured ones.
    pub fn train_with_criteria<F: FeatureMatrix + Sync>(
        &self,
        features: &F,
        labels: &LabelMatrix,
        nominal_mask: &NominalMask,
        visitor: &mut dyn PredictionVisitor,
        extra_criteria: Vec<Box<dyn StoppingCriterion>>,
    ) -> Result<RuleList, TrainingError> {
        if features.num_rows() != labels.num_rows() {
            return Err(TrainingError::ExampleCountMismatch {
                features: features.num_rows(),
                labels: labels.num_rows(),
            });
        }

        let num_examples = labels.num_rows();
        let mut statistics = SlotStatistics::new(labels.clone());
        let mut builder = RuleListBuilder::new();
        let mut num_rules: u32 = 0;

        // Induce the default rule, if configured. It predicts zero
        // everywhere and only counts toward the stopping criteria.
        if self.config.default_rule {
            builder.set_default_rule(Head::single(0.0));
            num_rules = 1;
        }

        let mut thresholds = ExactThresholds::new(features, nominal_mask);
        let partition = SinglePartition::new(num_examples);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        let mut stopping_criteria = self.build_stopping_criteria();
        stopping_criteria.extend(extra_criteria);
        let induction =
            TopDownRuleInduction::new(self.config.min_support, self.config.max_conditions);
        let label_indices = LabelIndices::Full(labels.num_cols());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads as usize)
            .build()
            .map_err(|e| TrainingError::ThreadPool(e.to_string()))?;

        self.logger.info(&format!(
            "starting induction: {} examples, {} features, {} time slots",
            num_examples,
            features.num_features(),
            labels.num_time_slots()
        ));

        let mut num_used_rules: u32 = 0;
        let mut current_quality: f64 = 0.0;

        loop {
            let stopping_result = test_stopping_criteria(
                &mut stopping_criteria,
                &partition,
                &statistics,
                num_rules,
            );

            match stopping_result.action {
                StoppingAction::ForceStop => break,
                StoppingAction::StoreStop if num_used_rules == 0 => {
                    num_used_rules = stopping_result.num_rules;
                }
                _ => {}
            }

            let weights = self.config.instance_sampling.sample(&partition, &mut rng);
            let (success, quality) = induction.induce_rule(
                &pool,
                &mut thresholds,
                &mut statistics,
                &label_indices,
                &weights,
                &self.config.feature_sampling,
                &mut rng,
                &mut builder,
                current_quality,
            );
            current_quality = quality;

            if !success {
                break;
            }

            num_rules += 1;
            self.logger.log_rule(
                num_rules,
                builder_last_body_len(&builder),
                current_quality,
            );
            visitor.visit_prediction(statistics.predictions());
        }

        visitor.visit_ground_truth(statistics.ground_truth());

        self.logger.info(&format!(
            "induction finished: {} rule(s), quality {:.6}",
            builder.num_rules(),
            current_quality
        ));

        Ok(builder.build(num_used_rules))
    }

    fn build_stopping_criteria(&self) -> Vec<Box<dyn StoppingCriterion>> {
        let mut criteria: Vec<Box<dyn StoppingCriterion>> = Vec::new();

        if self.config.max_rules != -1 {
            criteria.push(Box::new(SizeStoppingCriterion::new(
                self.config.max_rules as u32,
            )));
        }
        if self.config.time_limit != -1 {
            criteria.push(Box::new(TimeStoppingCriterion::new(Duration::from_secs(
                self.config.time_limit as u64,
            ))));
        }

        criteria
    }
}

fn builder_last_body_len(builder: &RuleListBuilder) -> usize {
    builder.last_rule().map_or(0, |rule| rule.body.len())
}
