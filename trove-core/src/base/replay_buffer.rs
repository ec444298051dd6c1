//! Replay buffer interface.
//!
//! Writers (the environment loop) only need [`ExperienceBufferBase`], while the
//! learner samples through [`ReplayBufferBase`] and, for prioritized buffers,
//! reports new priorities through [`PrioritizedReplayBufferBase`].

use anyhow::Result;

/// Interface for buffers that store experiences.
///
/// # Examples
///
/// ```ignore
/// struct SimpleBuffer<T> {
///     items: Vec<T>,
/// }
///
/// impl<T> ExperienceBufferBase for SimpleBuffer<T> {
///     type Item = T;
///
///     fn push(&mut self, tr: T) -> Result<()> {
///         self.items.push(tr);
///         Ok(())
///     }
///
///     fn len(&self) -> usize {
///         self.items.len()
///     }
/// }
/// ```
pub trait ExperienceBufferBase {
    /// The type of items stored in the buffer.
    type Item;

    /// Pushes a new experience into the buffer.
    fn push(&mut self, tr: Self::Item) -> Result<()>;

    /// Returns the current number of experiences in the buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the buffer holds no experience.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interface for replay buffers that generate batches for training.
pub trait ReplayBufferBase: Sized {
    /// Configuration parameters for the replay buffer.
    type Config: Clone;

    /// The type of batch generated for training.
    type Batch;

    /// Builds a new replay buffer from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TroveError::Configuration`](crate::TroveError::Configuration)
    /// if the configuration is invalid.
    fn build(config: &Self::Config) -> Result<Self>;

    /// Samples a batch of `size` experiences.
    ///
    /// # Errors
    ///
    /// Returns [`TroveError::InsufficientData`](crate::TroveError::InsufficientData)
    /// if `size` exceeds the number of stored experiences.
    fn batch(&mut self, size: usize) -> Result<Self::Batch>;
}

/// Interface for replay buffers whose sampling distribution depends on
/// priorities reported by the learner.
pub trait PrioritizedReplayBufferBase: ReplayBufferBase {
    /// Overwrites the priorities of the slots in `ixs`.
    ///
    /// `ixs` are typically the sample indices of a batch returned by
    /// [`ReplayBufferBase::batch`], and `priorities` the absolute TD errors
    /// computed on that batch.
    fn update_priority(&mut self, ixs: &[usize], priorities: &[f32]) -> Result<()>;
}
