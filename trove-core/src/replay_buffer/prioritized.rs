//! Prioritized experience replay (PER).
//!
//! Transitions are sampled with probability proportional to
//! $(p_i + \epsilon)^\alpha$ and returned with importance sampling weights
//! correcting the bias of non-uniform sampling.
mod iw_scheduler;
mod sum_tree;
use super::{
    config::PerConfig, store::TransitionStore, BatchBase, GenericTransitionBatch,
    PrioritizedReplayBufferConfig, Transition,
};
use crate::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase, TroveError};
use anyhow::Result;
pub use iw_scheduler::IwScheduler;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use sum_tree::SumTree;

/// State management for PER.
struct PerState {
    /// A sum tree for priority sampling.
    sum_tree: SumTree,

    /// Scheduler of the exponent of importance sampling weights.
    iw_scheduler: IwScheduler,
}

impl PerState {
    fn new(capacity: usize, per_config: &PerConfig) -> Self {
        Self {
            sum_tree: SumTree::new(capacity, per_config.alpha, per_config.epsilon),
            iw_scheduler: IwScheduler::new(per_config.beta_0, per_config.beta_increment),
        }
    }
}

/// A replay buffer sampling transitions in proportion to their priorities.
///
/// A pushed transition gets the maximum priority in the buffer (1 for the
/// first one), so that it is likely to be sampled before the learner reports
/// its actual priority through
/// [`update_priority`](PrioritizedReplayBufferBase::update_priority).
///
/// # Examples
///
/// ```ignore
/// let config = PrioritizedReplayBufferConfig::default().capacity(10000);
/// let mut buffer = PrioritizedReplayBuffer::<ObsBatch, ActBatch>::build(&config)?;
///
/// buffer.push(transition)?;
///
/// let batch = buffer.batch(32)?;
/// let td_errs = compute_td_errors(&batch);
/// buffer.update_priority(batch.ix_sample.as_ref().unwrap(), &td_errs)?;
/// ```
pub struct PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    store: TransitionStore<O, A>,
    rng: StdRng,
    per_state: PerState,
}

impl<O, A> PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Returns the exponent used for the importance sampling weights of the next batch.
    pub fn beta(&self) -> f32 {
        self.per_state.iw_scheduler.beta()
    }

    /// Returns the priority of slot `ix`, or `None` if the slot is empty.
    pub fn priority(&self, ix: usize) -> Option<f32> {
        if ix < self.store.len() {
            Some(self.per_state.sum_tree.priority(ix))
        } else {
            None
        }
    }

    /// Returns the priority that the next pushed transition will get.
    pub fn max_priority(&self) -> f32 {
        self.per_state.sum_tree.max()
    }

    /// Returns the number of terminal flags in the buffer.
    pub fn num_done_flags(&self) -> usize {
        self.store.num_done_flags()
    }

    /// Returns the sum of all rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.store.sum_rewards()
    }

    fn check_update(&self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        if ixs.len() != priorities.len() {
            return Err(TroveError::LengthMismatch {
                indices: ixs.len(),
                priorities: priorities.len(),
            }
            .into());
        }

        for (&index, &priority) in ixs.iter().zip(priorities.iter()) {
            if index >= self.store.len() {
                return Err(TroveError::IndexOutOfRange {
                    index,
                    len: self.store.len(),
                    capacity: self.store.capacity(),
                }
                .into());
            }
            if !priority.is_finite() || priority < 0.0 {
                return Err(TroveError::InvalidPriority { index, priority }.into());
            }
        }

        Ok(())
    }
}

impl<O, A> ExperienceBufferBase for PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Item = Transition<O, A>;

    fn len(&self) -> usize {
        self.store.len()
    }

    /// Adds a transition with the current maximum priority.
    ///
    /// When the buffer is full, the maximum includes the priority of the
    /// transition being overwritten.
    fn push(&mut self, tr: Self::Item) -> Result<()> {
        let max_p = self.per_state.sum_tree.max();
        let ix = self.store.push(tr);
        self.per_state.sum_tree.add(ix, max_p);
        Ok(())
    }
}

impl<O, A> ReplayBufferBase for PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    type Config = PrioritizedReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        let per_config = &config.per_config;
        info!(
            "Build prioritized replay buffer: capacity={}, alpha={}, beta_0={}, beta_increment={}, epsilon={}",
            capacity, per_config.alpha, per_config.beta_0, per_config.beta_increment, per_config.epsilon
        );

        Ok(Self {
            store: TransitionStore::new(capacity),
            rng: StdRng::seed_from_u64(config.seed),
            per_state: PerState::new(capacity, per_config),
        })
    }

    /// Samples transitions with replacement according to their priorities.
    ///
    /// The returned batch carries the sampled slot indices and importance
    /// sampling weights, the largest of which is 1. $\beta$ is annealed after
    /// the weights are computed.
    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let available = self.store.len();
        if size > available {
            return Err(TroveError::InsufficientData {
                requested: size,
                available,
            }
            .into());
        }

        let per_state = &mut self.per_state;
        debug_assert_eq!(per_state.sum_tree.len(), available);
        let beta = per_state.iw_scheduler.beta();
        let (ixs, weight) = per_state.sum_tree.sample(size, beta, &mut self.rng)?;
        per_state.iw_scheduler.add_n_batches();

        let mut batch = self.store.gather(&ixs);
        batch.weight = Some(weight);
        Ok(batch)
    }
}

impl<O, A> PrioritizedReplayBufferBase for PrioritizedReplayBuffer<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Overwrites priorities of filled slots.
    ///
    /// All pairs are checked before any priority changes, so a failing call
    /// leaves the buffer untouched.
    fn update_priority(&mut self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        self.check_update(ixs, priorities)?;
        for (&ix, &p) in ixs.iter().zip(priorities.iter()) {
            self.per_state.sum_tree.update(ix, p);
        }
        Ok(())
    }
}
