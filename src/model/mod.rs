//! Serializable rule-list model.
//!
//! A model is an ordered list of [`Rule`]s, each with a conjunctive body of
//! [`Condition`]s and a [`Head`] holding the predicted score. The optional
//! default rule has an empty body and comes first. Models serialize to JSON
//! via serde and print as human-readable IF-THEN lists.
//!
//! # Example
//!
//! ```
//! use syndrule::model::{Comparator, Condition, Head, Rule};
//!
//! let rule = Rule::new(
//!     vec![Condition::new(3, Comparator::Gr, 0.5)],
//!     Head::single(1.0),
//! );
//! assert_eq!(rule.to_string(), "f3 > 0.5 → +1");
//! ```

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

// ============================================================================
// Comparator & Condition
// ============================================================================

/// The test a condition applies to a feature value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    /// Value less than or equal to the threshold (numerical).
    Leq,
    /// Value greater than the threshold (numerical).
    Gr,
    /// Value equal to the threshold (nominal).
    Eq,
    /// Value not equal to the threshold (nominal).
    Neq,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leq => write!(f, "<="),
            Self::Gr => write!(f, ">"),
            Self::Eq => write!(f, "=="),
            Self::Neq => write!(f, "!="),
        }
    }
}

/// A single-feature boolean test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Index of the tested feature.
    pub feature: u32,
    /// The comparison operator.
    pub comparator: Comparator,
    /// The threshold the feature value is compared against.
    pub threshold: f32,
}

impl Condition {
    /// Create a condition.
    pub fn new(feature: u32, comparator: Comparator, threshold: f32) -> Self {
        Self {
            feature,
            comparator,
            threshold,
        }
    }

    /// Whether an example with the given feature value satisfies the
    /// condition. `None` denotes a missing value, which never matches.
    pub fn covers(&self, value: Option<f32>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self.comparator {
            Comparator::Leq => value <= self.threshold,
            Comparator::Gr => value > self.threshold,
            Comparator::Eq => value == self.threshold,
            Comparator::Neq => value != self.threshold,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{} {} {}", self.feature, self.comparator, self.threshold)
    }
}

// ============================================================================
// Head & Rule
// ============================================================================

/// The scores a rule predicts for the examples it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Head {
    /// One score per predicted target.
    pub scores: Vec<f64>,
}

impl Head {
    /// A head predicting a single score.
    pub fn single(score: f64) -> Self {
        Self {
            scores: vec![score],
        }
    }
}

impl fmt::Display for Head {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, score) in self.scores.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:+}", score)?;
        }
        Ok(())
    }
}

/// One IF-THEN rule: a conjunctive body and a head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// The conditions an example must all satisfy to be covered.
    pub body: Vec<Condition>,
    /// The prediction for covered examples.
    pub head: Head,
}

impl Rule {
    /// Create a rule.
    pub fn new(body: Vec<Condition>, head: Head) -> Self {
        Self { body, head }
    }

    /// A rule with an empty body, covering every example.
    pub fn default_rule(head: Head) -> Self {
        Self { body: vec![], head }
    }

    /// Whether the rule covers an example, given a lookup from feature index
    /// to its value (`None` for missing).
    pub fn covers<F: Fn(u32) -> Option<f32>>(&self, value_of: F) -> bool {
        self.body.iter().all(|c| c.covers(value_of(c.feature)))
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            write!(f, "TRUE")?;
        } else {
            for (i, condition) in self.body.iter().enumerate() {
                if i > 0 {
                    write!(f, " AND ")?;
                }
                write!(f, "{}", condition)?;
            }
        }
        write!(f, " → {}", self.head)
    }
}

// ============================================================================
// RuleList
// ============================================================================

/// An ordered rule list; the default rule, if any, comes first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleList {
    default_rule: Option<Rule>,
    rules: Vec<Rule>,
}

impl RuleList {
    /// The default rule, if one was induced.
    pub fn default_rule(&self) -> Option<&Rule> {
        self.default_rule.as_ref()
    }

    /// The learned rules, in induction order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Total number of rules, including the default rule.
    pub fn num_rules(&self) -> usize {
        self.rules.len() + usize::from(self.default_rule.is_some())
    }

    /// All rules in order, the default rule first.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.default_rule.iter().chain(self.rules.iter())
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Serialize to a writer as JSON.
    pub fn to_json_writer<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    /// Deserialize from a reader holding JSON.
    pub fn from_json_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        serde_json::from_reader(reader)
    }
}

impl fmt::Display for RuleList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in self.iter() {
            writeln!(f, "{}", rule)?;
        }
        Ok(())
    }
}

// ============================================================================
// RuleListBuilder
// ============================================================================

/// Collects rules during induction and assembles the final [`RuleList`].
#[derive(Debug, Default)]
pub struct RuleListBuilder {
    default_rule: Option<Rule>,
    rules: Vec<Rule>,
}

impl RuleListBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the default rule.
    pub fn set_default_rule(&mut self, head: Head) {
        self.default_rule = Some(Rule::default_rule(head));
    }

    /// Append a learned rule.
    pub fn add_rule(&mut self, body: Vec<Condition>, head: Head) {
        self.rules.push(Rule::new(body, head));
    }

    /// Number of rules added so far, including the default rule.
    pub fn num_rules(&self) -> usize {
        self.rules.len() + usize::from(self.default_rule.is_some())
    }

    /// The most recently added learned rule, if any.
    pub fn last_rule(&self) -> Option<&Rule> {
        self.rules.last()
    }

    /// Assemble the model.
    ///
    /// `num_used_rules == 0` keeps all rules; otherwise the model is
    /// truncated to the first `num_used_rules` rules, counting the default
    /// rule if present.
    pub fn build(self, num_used_rules: u32) -> RuleList {
        let Self {
            default_rule,
            mut rules,
        } = self;

        if num_used_rules > 0 {
            let keep = num_used_rules as usize - usize::from(default_rule.is_some());
            rules.truncate(keep);
        }

        RuleList {
            default_rule,
            rules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Comparator::Leq, 0.5, Some(0.5), true)]
    #[case(Comparator::Leq, 0.5, Some(0.6), false)]
    #[case(Comparator::Gr, 0.5, Some(0.6), true)]
    #[case(Comparator::Gr, 0.5, Some(0.5), false)]
    #[case(Comparator::Eq, 1.0, Some(1.0), true)]
    #[case(Comparator::Eq, 1.0, Some(2.0), false)]
    #[case(Comparator::Neq, 1.0, Some(2.0), true)]
    #[case(Comparator::Neq, 1.0, Some(1.0), false)]
    #[case(Comparator::Leq, 0.5, None, false)]
    #[case(Comparator::Neq, 1.0, None, false)]
    fn condition_covers(
        #[case] comparator: Comparator,
        #[case] threshold: f32,
        #[case] value: Option<f32>,
        #[case] expected: bool,
    ) {
        let condition = Condition::new(0, comparator, threshold);
        assert_eq!(condition.covers(value), expected);
    }

    #[test]
    fn rule_covers_requires_all_conditions() {
        let rule = Rule::new(
            vec![
                Condition::new(0, Comparator::Gr, 0.0),
                Condition::new(1, Comparator::Leq, 5.0),
            ],
            Head::single(1.0),
        );

        assert!(rule.covers(|f| Some(if f == 0 { 1.0 } else { 3.0 })));
        assert!(!rule.covers(|f| Some(if f == 0 { -1.0 } else { 3.0 })));
        assert!(!rule.covers(|f| if f == 0 { Some(1.0) } else { None }));
    }

    #[test]
    fn display_formats_rules() {
        let rule = Rule::new(
            vec![
                Condition::new(2, Comparator::Gr, 0.5),
                Condition::new(0, Comparator::Eq, 1.0),
            ],
            Head::single(1.0),
        );
        assert_eq!(rule.to_string(), "f2 > 0.5 AND f0 == 1 → +1");

        let default_rule = Rule::default_rule(Head::single(0.0));
        assert_eq!(default_rule.to_string(), "TRUE → +0");
    }

    #[test]
    fn builder_keeps_all_rules_when_num_used_is_zero() {
        let mut builder = RuleListBuilder::new();
        for i in 0..3 {
            builder.add_rule(
                vec![Condition::new(i, Comparator::Gr, 0.0)],
                Head::single(1.0),
            );
        }

        let model = builder.build(0);
        assert_eq!(model.num_rules(), 3);
    }

    #[test]
    fn builder_truncates_to_num_used_rules() {
        let mut builder = RuleListBuilder::new();
        for i in 0..8 {
            builder.add_rule(
                vec![Condition::new(i, Comparator::Gr, 0.0)],
                Head::single(1.0),
            );
        }

        let model = builder.build(3);
        assert_eq!(model.num_rules(), 3);
        assert_eq!(model.rules()[2].body[0].feature, 2);
    }

    #[test]
    fn builder_counts_default_rule_toward_num_used() {
        let mut builder = RuleListBuilder::new();
        builder.set_default_rule(Head::single(0.0));
        for i in 0..4 {
            builder.add_rule(
                vec![Condition::new(i, Comparator::Gr, 0.0)],
                Head::single(1.0),
            );
        }

        let model = builder.build(3);
        assert_eq!(model.num_rules(), 3);
        assert!(model.default_rule().is_some());
        assert_eq!(model.rules().len(), 2);
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let mut builder = RuleListBuilder::new();
        builder.add_rule(
            vec![Condition::new(1, Comparator::Leq, 0.25)],
            Head::single(1.0),
        );
        let model = builder.build(0);

        let json = model.to_json().unwrap();
        let restored = RuleList::from_json(&json).unwrap();
        assert_eq!(restored, model);
    }
}
