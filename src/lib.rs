//! syndrule: induction of ordered IF-THEN rule lists for time-indexed counts.
//!
//! This crate learns a human-readable list of conjunctive rules from a table
//! of per-example features. Examples are grouped into time slots; a rule
//! covers examples, and the per-slot number of distinct covered examples is
//! compared against a per-slot ground-truth count via Pearson correlation.
//! Rules are grown greedily, one condition at a time, by an exact search
//! over sorted sparse feature vectors.

pub mod data;
pub mod model;
pub mod statistics;
pub mod training;

mod utils;
