//! Stopping criteria for the sequential induction loop.
//!
//! Criteria are tested before every rule. A criterion may let training
//! continue, force an immediate stop, or request that the model be truncated
//! to the current rule count while training keeps going (the driver latches
//! the first such request).

use std::time::{Duration, Instant};

use crate::statistics::SlotStatistics;
use crate::training::sampling::SinglePartition;

/// What a stopping criterion wants the driver to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppingAction {
    /// Keep inducing rules.
    Continue,
    /// Keep inducing rules, but remember the current rule count as the
    /// number of rules the final model should use.
    StoreStop,
    /// Stop inducing rules now.
    ForceStop,
}

/// The result of testing a stopping criterion.
#[derive(Debug, Clone, Copy)]
pub struct StoppingResult {
    /// The requested action.
    pub action: StoppingAction,
    /// The rule count the action refers to.
    pub num_rules: u32,
}

impl StoppingResult {
    /// A result that lets training continue.
    pub fn keep_going() -> Self {
        Self {
            action: StoppingAction::Continue,
            num_rules: 0,
        }
    }
}

/// A criterion consulted before each rule induction.
pub trait StoppingCriterion {
    /// Test whether training should stop after `num_rules` rules.
    fn test(
        &mut self,
        partition: &SinglePartition,
        statistics: &SlotStatistics,
        num_rules: u32,
    ) -> StoppingResult;
}

/// Stops once the model has reached a maximum number of rules.
#[derive(Debug, Clone, Copy)]
pub struct SizeStoppingCriterion {
    max_rules: u32,
}

impl SizeStoppingCriterion {
    /// Stop when `num_rules` reaches `max_rules`.
    pub fn new(max_rules: u32) -> Self {
        Self { max_rules }
    }
}

impl StoppingCriterion for SizeStoppingCriterion {
    fn test(
        &mut self,
        _partition: &SinglePartition,
        _statistics: &SlotStatistics,
        num_rules: u32,
    ) -> StoppingResult {
        if num_rules >= self.max_rules {
            StoppingResult {
                action: StoppingAction::ForceStop,
                num_rules,
            }
        } else {
            StoppingResult::keep_going()
        }
    }
}

/// Stops once a wall-clock time budget is exhausted.
///
/// The clock starts at the first test.
#[derive(Debug, Clone)]
pub struct TimeStoppingCriterion {
    time_limit: Duration,
    start: Option<Instant>,
}

impl TimeStoppingCriterion {
    /// Stop after `time_limit` of training time.
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            start: None,
        }
    }
}

impl StoppingCriterion for TimeStoppingCriterion {
    fn test(
        &mut self,
        _partition: &SinglePartition,
        _statistics: &SlotStatistics,
        num_rules: u32,
    ) -> StoppingResult {
        let start = *self.start.get_or_insert_with(Instant::now);

        if start.elapsed() >= self.time_limit {
            StoppingResult {
                action: StoppingAction::ForceStop,
                num_rules,
            }
        } else {
            StoppingResult::keep_going()
        }
    }
}

/// Test all criteria and combine their results: a forced stop wins
/// immediately, a store request is reported, otherwise training continues.
pub fn test_stopping_criteria(
    criteria: &mut [Box<dyn StoppingCriterion>],
    partition: &SinglePartition,
    statistics: &SlotStatistics,
    num_rules: u32,
) -> StoppingResult {
    let mut result = StoppingResult::keep_going();

    for criterion in criteria.iter_mut() {
        let criterion_result = criterion.test(partition, statistics, num_rules);

        match criterion_result.action {
            StoppingAction::ForceStop => return criterion_result,
            StoppingAction::StoreStop => result = criterion_result,
            StoppingAction::Continue => {}
        }
    }

    result
}
