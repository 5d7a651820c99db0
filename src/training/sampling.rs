//! Instance and feature sub-sampling.
//!
//! Each rule is grown on a sub-sample: instance sampling assigns per-example
//! weights (zero means "outside the sample"), and feature sampling picks the
//! candidate features considered in each refinement iteration. Both draw
//! from a shared seeded RNG stream, so a run is reproducible from its seed.

use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::WeightVector;

// ============================================================================
// SinglePartition
// ============================================================================

/// The trivial partition: every example belongs to the training set.
#[derive(Debug, Clone, Copy)]
pub struct SinglePartition {
    num_examples: u32,
}

impl SinglePartition {
    /// A partition over `num_examples` training examples.
    pub fn new(num_examples: u32) -> Self {
        Self { num_examples }
    }

    /// Number of training examples.
    #[inline]
    pub fn num_examples(&self) -> u32 {
        self.num_examples
    }
}

// ============================================================================
// InstanceSampling
// ============================================================================

/// Strategy for sub-sampling training examples per rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InstanceSampling {
    /// Use all examples with weight one (default).
    None,
    /// Random subset without replacement.
    Random {
        /// Fraction of examples to include. Must be in (0, 1).
        sample_size: f32,
    },
}

impl Default for InstanceSampling {
    fn default() -> Self {
        Self::None
    }
}

impl InstanceSampling {
    /// Sample weights for one rule.
    pub fn sample(&self, partition: &SinglePartition, rng: &mut Xoshiro256PlusPlus) -> WeightVector {
        let num_examples = partition.num_examples();
        match self {
            Self::None => WeightVector::equal(num_examples),
            Self::Random { sample_size } => {
                let num_samples = (sample_size * num_examples as f32) as u32;
                let sampled =
                    sample_indices_without_replacement(num_examples, num_samples, rng);
                let mut weights = vec![0u32; num_examples as usize];
                for index in sampled {
                    weights[index as usize] = 1;
                }
                WeightVector::dense(weights)
            }
        }
    }
}

// ============================================================================
// FeatureSampling
// ============================================================================

/// Strategy for sub-sampling candidate features per refinement iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureSampling {
    /// Consider all features (default).
    None,
    /// Random subset without replacement.
    Random {
        /// Fraction of features to include. A value of zero selects
        /// `floor(log2(num_features - 1) + 1)` features.
        sample_size: f32,
    },
}

impl Default for FeatureSampling {
    fn default() -> Self {
        Self::None
    }
}

impl FeatureSampling {
    /// Sample candidate feature indices, sorted ascending.
    pub fn sample(&self, num_features: u32, rng: &mut Xoshiro256PlusPlus) -> Vec<u32> {
        match self {
            Self::None => (0..num_features).collect(),
            Self::Random { sample_size } => {
                let num_samples = if *sample_size > 0.0 {
                    (sample_size * num_features as f32) as u32
                } else {
                    (f64::from(num_features.saturating_sub(1)).log2().floor() as u32) + 1
                };
                let num_samples = num_samples.clamp(1, num_features);
                let mut sampled =
                    sample_indices_without_replacement(num_features, num_samples, rng);
                sampled.sort_unstable();
                sampled
            }
        }
    }
}

/// Sample `k` of `n` indices without replacement via a partial
/// Fisher-Yates shuffle.
fn sample_indices_without_replacement(
    n: u32,
    k: u32,
    rng: &mut Xoshiro256PlusPlus,
) -> Vec<u32> {
    let k = k.min(n) as usize;
    let mut indices: Vec<u32> = (0..n).collect();

    for i in 0..k {
        let j = rng.gen_range(i..n as usize);
        indices.swap(i, j);
    }

    indices.truncate(k);
    indices
}
