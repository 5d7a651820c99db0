//! Rule induction: search, sampling, stopping, and the training driver.
//!
//! The entry point is [`RuleListTrainer`]. Internally, one rule at a time is
//! grown by [`TopDownRuleInduction`]: candidate features are swept by the
//! exact refinement search over a [`ExactThresholds`] cache of sorted,
//! coverage-filtered feature vectors, and the best condition per iteration
//! is committed until no condition improves the rule.

mod head;
mod induction;
mod logger;
mod refinement;
mod sampling;
mod stopping;
mod thresholds;
mod trainer;

pub use head::{EvaluatedHead, FullHeadRefinement};
pub use induction::TopDownRuleInduction;
pub use logger::{TrainingLogger, Verbosity};
pub use refinement::{find_refinement, Refinement};
pub use sampling::{FeatureSampling, InstanceSampling, SinglePartition};
pub use stopping::{
    test_stopping_criteria, SizeStoppingCriterion, StoppingAction, StoppingCriterion,
    StoppingResult, TimeStoppingCriterion,
};
pub use thresholds::{ExactThresholds, ThresholdsSubset};
pub use trainer::{
    NoOpVisitor, PredictionVisitor, RuleListConfig, RuleListTrainer, TrainingError,
};
