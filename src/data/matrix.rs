//! Feature matrices.
//!
//! The training code never iterates rows; it asks for one feature column at
//! a time via [`FeatureMatrix::fetch_feature_vector`] and receives a sparse
//! [`FeatureVector`]. Two storage layouts are provided:
//!
//! - [`DenseFeatureMatrix`]: a column-accessed `ndarray` matrix
//! - [`CscFeatureMatrix`]: compressed sparse column storage
//!
//! In both layouts, NaN marks a missing value and exact zeros are left
//! implicit in the fetched vector (the refinement search materializes them
//! as the sparse-zero class).

use ndarray::Array2;

use crate::data::{FeatureEntry, FeatureVector};

/// Column access to the feature values of the training examples.
pub trait FeatureMatrix {
    /// Number of examples.
    fn num_rows(&self) -> u32;

    /// Number of features.
    fn num_features(&self) -> u32;

    /// Fetch the (unsorted) sparse vector of feature `feature`.
    fn fetch_feature_vector(&self, feature: u32) -> FeatureVector;
}

// ============================================================================
// DenseFeatureMatrix
// ============================================================================

/// A dense feature matrix backed by `ndarray`.
#[derive(Debug, Clone)]
pub struct DenseFeatureMatrix {
    values: Array2<f32>,
}

impl DenseFeatureMatrix {
    /// Create a matrix from a `(rows, features)` array.
    pub fn new(values: Array2<f32>) -> Self {
        Self { values }
    }

    /// Create a matrix from a row-major value slice.
    ///
    /// # Panics
    /// Panics if `values.len() != num_rows * num_features`.
    pub fn from_vec(values: Vec<f32>, num_rows: usize, num_features: usize) -> Self {
        let values = Array2::from_shape_vec((num_rows, num_features), values)
            .expect("value count must equal num_rows * num_features");
        Self { values }
    }
}

impl FeatureMatrix for DenseFeatureMatrix {
    fn num_rows(&self) -> u32 {
        self.values.nrows() as u32
    }

    fn num_features(&self) -> u32 {
        self.values.ncols() as u32
    }

    fn fetch_feature_vector(&self, feature: u32) -> FeatureVector {
        let column = self.values.column(feature as usize);
        let mut entries = Vec::new();
        let mut missing = Vec::new();

        for (row, &value) in column.iter().enumerate() {
            if value.is_nan() {
                missing.push(row as u32);
            } else if value != 0.0 {
                entries.push(FeatureEntry {
                    value,
                    index: row as u32,
                });
            }
        }

        FeatureVector::new(entries, missing)
    }
}

// ============================================================================
// CscFeatureMatrix
// ============================================================================

/// A compressed-sparse-column feature matrix.
///
/// Column `j` stores its explicit values in
/// `data[col_pointers[j]..col_pointers[j + 1]]` with matching row indices.
/// Rows absent from a column implicitly hold the value zero.
#[derive(Debug, Clone)]
pub struct CscFeatureMatrix {
    num_rows: u32,
    num_features: u32,
    data: Vec<f32>,
    row_indices: Vec<u32>,
    col_pointers: Vec<u32>,
}

impl CscFeatureMatrix {
    /// Create a matrix from raw CSC buffers.
    ///
    /// # Panics
    /// Panics if the pointer array does not have `num_features + 1` entries
    /// or if `data` and `row_indices` disagree in length.
    pub fn new(
        num_rows: u32,
        num_features: u32,
        data: Vec<f32>,
        row_indices: Vec<u32>,
        col_pointers: Vec<u32>,
    ) -> Self {
        assert_eq!(
            col_pointers.len(),
            num_features as usize + 1,
            "col_pointers must have num_features + 1 entries"
        );
        assert_eq!(
            data.len(),
            row_indices.len(),
            "data and row_indices must have equal length"
        );
        Self {
            num_rows,
            num_features,
            data,
            row_indices,
            col_pointers,
        }
    }
}

impl FeatureMatrix for CscFeatureMatrix {
    fn num_rows(&self) -> u32 {
        self.num_rows
    }

    fn num_features(&self) -> u32 {
        self.num_features
    }

    fn fetch_feature_vector(&self, feature: u32) -> FeatureVector {
        let start = self.col_pointers[feature as usize] as usize;
        let end = self.col_pointers[feature as usize + 1] as usize;
        let mut entries = Vec::with_capacity(end - start);
        let mut missing = Vec::new();

        for i in start..end {
            let value = self.data[i];
            let index = self.row_indices[i];

            if value.is_nan() {
                missing.push(index);
            } else if value != 0.0 {
                entries.push(FeatureEntry { value, index });
            }
        }

        FeatureVector::new(entries, missing)
    }
}
