//! [`ndarray`] columns for trove replay buffers.
//!
//! [`NdarrayBatch`] stores observations or actions of any shape as one
//! contiguous array of shape `[capacity, ..]`, so a sampled batch can be handed
//! to a numeric backend without copying record by record.
#![warn(missing_docs)]
use log::trace;
use ndarray::{ArrayD, Axis, IxDyn};
use num_traits::Zero;
use trove_core::replay_buffer::BatchBase;

/// A column backed by an [`ArrayD`].
///
/// The storage is allocated on the first push, with the record shape taken
/// from the pushed data.
#[derive(Clone, Debug)]
pub struct NdarrayBatch<T> {
    buf: Option<ArrayD<T>>,
    capacity: usize,
}

impl<T> NdarrayBatch<T> {
    /// Creates a column holding a single record.
    pub fn from_row(row: ArrayD<T>) -> Self {
        Self::from_batch(row.insert_axis(Axis(0)))
    }

    /// Creates a column from an array whose first axis indexes records.
    pub fn from_batch(batch: ArrayD<T>) -> Self {
        let capacity = batch.shape().first().copied().unwrap_or(0);
        Self {
            buf: Some(batch),
            capacity,
        }
    }

    /// Returns the underlying array, `None` before anything was pushed.
    pub fn as_array(&self) -> Option<&ArrayD<T>> {
        self.buf.as_ref()
    }

    /// Consumes the column and returns the underlying array.
    pub fn into_array(self) -> Option<ArrayD<T>> {
        self.buf
    }

    /// Returns the number of records the column can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the shape of a single record.
    pub fn row_shape(&self) -> Option<&[usize]> {
        self.buf.as_ref().map(|b| &b.shape()[1..])
    }
}

impl<T> BatchBase for NdarrayBatch<T>
where
    T: Clone + Zero,
{
    fn new(capacity: usize) -> Self {
        Self {
            buf: None,
            capacity,
        }
    }

    /// Writes the records of `data` starting at `ix`, wrapping past the end.
    ///
    /// # Panics
    ///
    /// Panics if the record shape of `data` differs from the stored one.
    fn push(&mut self, ix: usize, data: Self) {
        let data = match data.buf {
            Some(data) if data.len_of(Axis(0)) > 0 => data,
            _ => return,
        };
        if self.capacity == 0 {
            return;
        }

        let capacity = self.capacity;
        let buf = self.buf.get_or_insert_with(|| {
            let mut shape = data.shape().to_vec();
            shape[0] = capacity;
            trace!("Allocate ndarray column with shape {:?}", shape);
            ArrayD::zeros(IxDyn(&shape))
        });
        assert_eq!(
            &buf.shape()[1..],
            &data.shape()[1..],
            "record shape mismatch"
        );

        for (j, row) in data.axis_iter(Axis(0)).enumerate() {
            let k = (ix + j) % capacity;
            buf.index_axis_mut(Axis(0), k).assign(&row);
        }
    }

    /// Number of rows, `capacity` once the storage is allocated.
    fn len(&self) -> usize {
        self.buf.as_ref().map_or(0, |buf| buf.len_of(Axis(0)))
    }

    /// Gathers the records at `ixs` into a contiguous array.
    fn sample(&self, ixs: &[usize]) -> Self {
        let buf = self.buf.as_ref().map(|buf| {
            if ixs.is_empty() {
                let mut shape = buf.shape().to_vec();
                shape[0] = 0;
                ArrayD::zeros(IxDyn(&shape))
            } else {
                buf.select(Axis(0), ixs)
                    .as_standard_layout()
                    .into_owned()
            }
        });
        Self {
            buf,
            capacity: ixs.len(),
        }
    }
}

impl<T> From<ArrayD<T>> for NdarrayBatch<T> {
    fn from(batch: ArrayD<T>) -> Self {
        Self::from_batch(batch)
    }
}
