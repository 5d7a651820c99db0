//! Input data structures for rule induction.
//!
//! This module provides the containers the training code consumes:
//!
//! - [`FeatureVector`]: sparse, value-sorted view of one feature column
//! - [`FeatureMatrix`]: access to feature columns ([`DenseFeatureMatrix`],
//!   [`CscFeatureMatrix`])
//! - [`LabelMatrix`]: time-slot segmentation of the target sequence
//! - [`NominalMask`]: which features take nominal (categorical) values
//! - [`WeightVector`]: per-example sample weights
//! - [`CoverageMask`]: which examples the partially grown rule still covers

mod coverage;
mod feature_vector;
mod label_matrix;
mod matrix;
mod nominal;
mod weights;

pub use coverage::CoverageMask;
pub use feature_vector::{FeatureEntry, FeatureVector};
pub use label_matrix::{LabelMatrix, LabelMatrixError};
pub use matrix::{CscFeatureMatrix, DenseFeatureMatrix, FeatureMatrix};
pub use nominal::NominalMask;
pub use weights::WeightVector;
