//! Time-slot segmentation of the target sequence.
//!
//! Training examples arrive sorted by a discrete time marker (e.g. a
//! calendar week). All examples sharing a marker form one time slot with a
//! single ground-truth count. The [`LabelMatrix`] records, for every
//! example, the slot it belongs to and, for every slot, its example-index
//! range and ground-truth value.

/// Errors raised when constructing a [`LabelMatrix`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum LabelMatrixError {
    #[error("label matrix must contain at least one example")]
    Empty,

    #[error("timestamps must be non-decreasing: example {example} has {got} after {previous}")]
    UnsortedTimestamps {
        example: usize,
        previous: u32,
        got: u32,
    },
}

/// Per-example time slots and per-slot ground-truth counts.
///
/// Constructed from `(timestamp, count)` rows; consecutive rows with the
/// same timestamp collapse into one slot whose ground-truth count is taken
/// from the slot's first row.
#[derive(Debug, Clone)]
pub struct LabelMatrix {
    /// Time-slot index of each example.
    time_slots: Vec<u32>,
    /// Example-index boundaries per slot: slot t spans
    /// `[indices[t], indices[t + 1])`.
    indices: Vec<u32>,
    /// Ground-truth count per slot.
    values: Vec<u32>,
}

impl LabelMatrix {
    /// Build a label matrix from per-example `(timestamp, count)` rows.
    pub fn from_rows(rows: &[(u32, u32)]) -> Result<Self, LabelMatrixError> {
        if rows.is_empty() {
            return Err(LabelMatrixError::Empty);
        }

        let mut time_slots = Vec::with_capacity(rows.len());
        let mut indices = vec![0u32];
        let mut values = vec![rows[0].1];
        let mut previous_timestamp = rows[0].0;
        let mut slot = 0u32;
        time_slots.push(slot);

        for (example, &(timestamp, count)) in rows.iter().enumerate().skip(1) {
            if timestamp < previous_timestamp {
                return Err(LabelMatrixError::UnsortedTimestamps {
                    example,
                    previous: previous_timestamp,
                    got: timestamp,
                });
            }
            if timestamp != previous_timestamp {
                slot += 1;
                indices.push(example as u32);
                values.push(count);
                previous_timestamp = timestamp;
            }
            time_slots.push(slot);
        }

        indices.push(rows.len() as u32);

        Ok(Self {
            time_slots,
            indices,
            values,
        })
    }

    /// Number of examples.
    #[inline]
    pub fn num_rows(&self) -> u32 {
        self.time_slots.len() as u32
    }

    /// Number of target columns. Always one: a single count per slot.
    #[inline]
    pub fn num_cols(&self) -> u32 {
        1
    }

    /// Number of time slots.
    #[inline]
    pub fn num_time_slots(&self) -> u32 {
        self.values.len() as u32
    }

    /// The time slot example `index` belongs to.
    #[inline]
    pub fn time_slot_of_example(&self, index: u32) -> u32 {
        self.time_slots[index as usize]
    }

    /// The `[start, end)` example-index range of time slot `slot`.
    #[inline]
    pub fn examples_in_time_slot(&self, slot: u32) -> (u32, u32) {
        (
            self.indices[slot as usize],
            self.indices[slot as usize + 1],
        )
    }

    /// Ground-truth count per time slot.
    #[inline]
    pub fn values_by_time_slot(&self) -> &[u32] {
        &self.values
    }
}
