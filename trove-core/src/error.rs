//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
///
/// Fallible APIs return [`anyhow::Result`]; use `downcast_ref::<TroveError>()`
/// on the returned error to match on a specific variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TroveError {
    /// A batch larger than the number of stored transitions was requested.
    #[error("Insufficient data: requested {requested} samples, but only {available} are stored")]
    InsufficientData {
        /// Requested batch size.
        requested: usize,
        /// Number of transitions currently stored.
        available: usize,
    },

    /// A priority update referred to a slot outside of the filled range.
    #[error("Index {index} is out of range (filled slots: {len}, capacity: {capacity})")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// Number of filled slots.
        len: usize,
        /// Capacity of the buffer.
        capacity: usize,
    },

    /// Invalid configuration, rejected when building a buffer.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Indices and priorities of different lengths were given.
    #[error("Length mismatch: {indices} indices but {priorities} priorities")]
    LengthMismatch {
        /// Number of indices.
        indices: usize,
        /// Number of priorities.
        priorities: usize,
    },

    /// A negative or non-finite priority was given.
    #[error("Invalid priority {priority} for index {index}")]
    InvalidPriority {
        /// Slot index.
        index: usize,
        /// Offending priority.
        priority: f32,
    },

    /// Total sampling mass is zero or not finite.
    #[error("Degenerate sampling distribution (total mass: {0})")]
    DegenerateDistribution(f64),

    /// The lock of a shared buffer was poisoned by a panicking thread.
    #[error("Lock of the shared replay buffer is poisoned")]
    LockPoisoned,
}
