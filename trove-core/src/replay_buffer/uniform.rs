//! Replay buffer with uniform sampling.
use super::{
    store::TransitionStore, BatchBase, GenericTransitionBatch, Transition,
    UniformReplayBufferConfig,
};
use crate::{ExperienceBufferBase, ReplayBufferBase, TroveError};
use anyhow::Result;
use log::info;
use rand::{rngs::StdRng, seq::index, SeedableRng};

/// A bounded ring buffer sampling transitions uniformly without replacement.
///
/// # Examples
///
/// ```rust
/// use trove_core::{
///     replay_buffer::{Transition, UniformReplayBuffer, UniformReplayBufferConfig},
///     ExperienceBufferBase, ReplayBufferBase,
/// };
///
/// let config = UniformReplayBufferConfig::default().capacity(100);
/// let mut buffer = UniformReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
///
/// for t in 0..10 {
///     let tr = Transition::new(vec![t as f32], vec![0], 1.0, vec![t as f32 + 1.0], false);
///     buffer.push(tr).unwrap();
/// }
///
/// let batch = buffer.batch(4).unwrap();
/// assert_eq!(batch.len(), 4);
/// ```
pub struct UniformReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    store: TransitionStore<O, A>,
    rng: StdRng,
}

impl<O, A> UniformReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Returns the number of terminal flags in the buffer.
    pub fn num_done_flags(&self) -> usize {
        self.store.num_done_flags()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.store.sum_rewards()
    }
}

impl<O, A> ExperienceBufferBase for UniformReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = Transition<O, A>;

    fn len(&self) -> usize {
        self.store.len()
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        self.store.push(tr);
        Ok(())
    }
}

impl<O, A> ReplayBufferBase for UniformReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = UniformReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        info!("Build uniform replay buffer: capacity={}", config.capacity);

        Ok(Self {
            store: TransitionStore::new(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Samples `size` distinct transitions.
    ///
    /// The batch has no importance sampling weights.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let available = self.store.len();
        if size > available {
            return Err(TroveError::InsufficientData {
                requested: size,
                available,
            }
            .into());
        }

        let ixs = index::sample(&mut self.rng, available, size).into_vec();
        Ok(self.store.gather(&ixs))
    }
}
