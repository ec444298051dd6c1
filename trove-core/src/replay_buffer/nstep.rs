//! N-step prioritized experience replay.
//!
//! Consecutive transitions are collected in a window of depth `nstep` and
//! folded into one transition with the discounted sum of rewards
//! $\sum_{k=0}^{n-1} \gamma^k r_{t+k}$, cut at the first terminal step in the
//! window. Folded transitions are stored in a [`PrioritizedReplayBuffer`].
use super::{
    BatchBase, GenericTransitionBatch, NStepConfig, NStepPrioritizedReplayBufferConfig,
    PrioritizedReplayBuffer, Transition,
};
use crate::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase};
use anyhow::Result;
use log::{info, trace};
use std::collections::VecDeque;

/// Sliding window folding `nstep` consecutive transitions into one.
///
/// The window is filling until it holds `nstep` transitions. From then on it
/// stays full, each push evicting the oldest transition and emitting a folded
/// one. It is not cleared at episode boundaries, since folding stops at the
/// first terminal step anyway.
#[derive(Clone, Debug)]
pub struct NStepWindow<O, A> {
    nstep: usize,
    gamma: f32,
    buf: VecDeque<Transition<O, A>>,
}

impl<O, A> NStepWindow<O, A>
where
    O: Clone,
    A: Clone,
{
    /// Creates an empty window.
    ///
    /// # Errors
    ///
    /// Returns [`TroveError::Configuration`](crate::TroveError::Configuration)
    /// if `nstep` is zero or `gamma` is outside `[0, 1]`.
    pub fn new(config: &NStepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            nstep: config.nstep,
            gamma: config.gamma,
            buf: VecDeque::with_capacity(config.nstep),
        })
    }

    /// Number of transitions in the window.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if the window holds no transition.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns `true` once the window holds `nstep` transitions.
    pub fn is_ready(&self) -> bool {
        self.buf.len() == self.nstep
    }

    /// Pushes a transition and returns the folded transition if the window is full.
    pub fn push(&mut self, tr: Transition<O, A>) -> Option<Transition<O, A>> {
        if self.buf.len() == self.nstep {
            self.buf.pop_front();
        }
        self.buf.push_back(tr);

        if self.is_ready() {
            Some(self.fold())
        } else {
            None
        }
    }

    /// Folds the transitions in the window, which must not be empty.
    ///
    /// Observation and action come from the oldest transition. Walking back
    /// from the newest one, a terminal step discards the rewards after it and
    /// replaces the next observation, so the earliest terminal step wins.
    fn fold(&self) -> Transition<O, A> {
        let n = self.buf.len();
        let last = &self.buf[n - 1];
        let mut reward = last.reward;
        let mut next_obs = &last.next_obs;
        let mut is_done = last.is_done;

        for step in self.buf.range(..n - 1).rev() {
            let not_done = if step.is_done { 0f32 } else { 1f32 };
            reward = step.reward + self.gamma * reward * not_done;
            if step.is_done {
                next_obs = &step.next_obs;
                is_done = true;
            }
        }
        trace!("Folded {} steps: reward={}, is_done={}", n, reward, is_done);

        let first = &self.buf[0];
        Transition {
            obs: first.obs.clone(),
            act: first.act.clone(),
            reward,
            next_obs: next_obs.clone(),
            is_done,
        }
    }
}

/// A prioritized replay buffer storing n-step transitions.
///
/// Sampling and priority updates behave as in [`PrioritizedReplayBuffer`];
/// only pushing differs. The first `nstep - 1` pushes only fill the window
/// and store nothing.
///
/// # Examples
///
/// ```rust
/// use trove_core::{
///     replay_buffer::{
///         NStepConfig, NStepPrioritizedReplayBuffer, NStepPrioritizedReplayBufferConfig,
///         Transition,
///     },
///     ExperienceBufferBase, ReplayBufferBase,
/// };
///
/// let config = NStepPrioritizedReplayBufferConfig::default()
///     .capacity(100)
///     .nstep_config(NStepConfig::default().nstep(3).gamma(0.9));
/// let mut buffer =
///     NStepPrioritizedReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
///
/// for t in 0..3 {
///     let tr = Transition::new(vec![t as f32], vec![0], 1.0, vec![t as f32 + 1.0], t == 2);
///     buffer.push(tr).unwrap();
/// }
/// assert_eq!(buffer.len(), 1);
///
/// let batch = buffer.batch(1).unwrap();
/// assert!((batch.reward[0] - 2.71).abs() < 1e-5);
/// ```
pub struct NStepPrioritizedReplayBuffer<O, A>
where
    O: BatchBase + Clone,
    A: BatchBase + Clone,
{
    window: NStepWindow<O, A>,
    buffer: PrioritizedReplayBuffer<O, A>,
}

impl<O, A> NStepPrioritizedReplayBuffer<O, A>
where
    O: BatchBase + Clone,
    A: BatchBase + Clone,
{
    /// Returns the number of raw transitions waiting in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Returns the maximum number of folded transitions.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Returns the exponent used for the importance sampling weights of the next batch.
    pub fn beta(&self) -> f32 {
        self.buffer.beta()
    }

    /// Returns the priority of slot `ix`, or `None` if the slot is empty.
    pub fn priority(&self, ix: usize) -> Option<f32> {
        self.buffer.priority(ix)
    }

    /// Returns the number of terminal flags in the stored folded transitions.
    pub fn num_done_flags(&self) -> usize {
        self.buffer.num_done_flags()
    }

    /// Returns the sum of the folded rewards in the buffer.
    pub fn sum_rewards(&self) -> f32 {
        self.buffer.sum_rewards()
    }
}

impl<O, A> ExperienceBufferBase for NStepPrioritizedReplayBuffer<O, A>
where
    O: BatchBase + Clone,
    A: BatchBase + Clone,
{
    type Item = Transition<O, A>;

    /// Returns the number of folded transitions.
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        match self.window.push(tr) {
            Some(folded) => self.buffer.push(folded),
            None => Ok(()),
        }
    }
}

impl<O, A> ReplayBufferBase for NStepPrioritizedReplayBuffer<O, A>
where
    O: BatchBase + Clone,
    A: BatchBase + Clone,
{
    type Config = NStepPrioritizedReplayBufferConfig;
    type Batch = GenericTransitionBatch<O, A>;

    fn build(config: &Self::Config) -> Result<Self> {
        config.validate()?;
        let nstep_config = &config.nstep_config;
        info!(
            "Build n-step replay buffer: nstep={}, gamma={}",
            nstep_config.nstep, nstep_config.gamma
        );

        Ok(Self {
            window: NStepWindow::new(nstep_config)?,
            buffer: PrioritizedReplayBuffer::build(&config.prioritized())?,
        })
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        self.buffer.batch(size)
    }
}

impl<O, A> PrioritizedReplayBufferBase for NStepPrioritizedReplayBuffer<O, A>
where
    O: BatchBase + Clone,
    A: BatchBase + Clone,
{
    fn update_priority(&mut self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        self.buffer.update_priority(ixs, priorities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TroveError;
    use test_log::test;

    type Tr = Transition<Vec<f32>, Vec<i64>>;
    type Buffer = NStepPrioritizedReplayBuffer<Vec<f32>, Vec<i64>>;

    fn step(t: usize, reward: f32, is_done: bool) -> Tr {
        Transition::new(vec![t as f32], vec![t as i64], reward, vec![t as f32 + 0.5], is_done)
    }

    fn window<O: Clone, A: Clone>(nstep: usize, gamma: f32) -> NStepWindow<O, A> {
        NStepWindow::new(&NStepConfig::default().nstep(nstep).gamma(gamma)).unwrap()
    }

    fn build(capacity: usize, nstep: usize, gamma: f32) -> Buffer {
        let config = NStepPrioritizedReplayBufferConfig::default()
            .capacity(capacity)
            .nstep_config(NStepConfig::default().nstep(nstep).gamma(gamma));
        Buffer::build(&config).unwrap()
    }

    #[test]
    fn test_window_fills_then_stays_ready() {
        let mut window = window::<Vec<f32>, Vec<i64>>(3, 0.9);
        assert!(window.is_empty());
        assert!(window.push(step(0, 1.0, false)).is_none());
        assert!(window.push(step(1, 1.0, false)).is_none());
        assert!(!window.is_ready());
        for t in 2..10 {
            assert!(window.push(step(t, 1.0, false)).is_some());
            assert!(window.is_ready());
            assert_eq!(window.len(), 3);
        }
    }

    #[test]
    fn test_fold_terminal_last_step() {
        let mut window = window(3, 0.9);
        window.push(step(0, 1.0, false));
        window.push(step(1, 1.0, false));
        let folded = window.push(step(2, 1.0, true)).unwrap();

        assert!((folded.reward - 2.71).abs() < 1e-6);
        assert!(folded.is_done);
        assert_eq!(folded.next_obs, vec![2.5]);
        assert_eq!(folded.obs, vec![0.0]);
        assert_eq!(folded.act, vec![0]);
    }

    #[test]
    fn test_fold_earliest_termination_wins() {
        let mut window = window(4, 0.5);
        window.push(step(0, 1.0, false));
        window.push(step(1, 2.0, true));
        window.push(step(2, 4.0, true));
        let folded = window.push(step(3, 8.0, false)).unwrap();

        // 1 + 0.5 * 2, rewards after the first terminal step are dropped
        assert!((folded.reward - 2.0).abs() < 1e-6);
        assert!(folded.is_done);
        assert_eq!(folded.next_obs, vec![1.5]);
    }

    #[test]
    fn test_fold_without_termination() {
        let mut window = window(3, 0.5);
        window.push(step(0, 1.0, false));
        window.push(step(1, 2.0, false));
        let folded = window.push(step(2, 4.0, false)).unwrap();
        assert!((folded.reward - 3.0).abs() < 1e-6);
        assert!(!folded.is_done);
        assert_eq!(folded.next_obs, vec![2.5]);

        // the window slides by one
        let folded = window.push(step(3, 0.0, false)).unwrap();
        assert!((folded.reward - 4.0).abs() < 1e-6);
        assert_eq!(folded.obs, vec![1.0]);
        assert_eq!(folded.next_obs, vec![3.5]);
    }

    #[test]
    fn test_fold_window_spanning_episodes() {
        let mut window = window(3, 0.9);
        window.push(step(0, 3.0, true));
        window.push(step(1, 1.0, false));
        let folded = window.push(step(2, 1.0, false)).unwrap();
        assert_eq!(folded.reward, 3.0);
        assert!(folded.is_done);
        assert_eq!(folded.obs, vec![0.0]);
        assert_eq!(folded.next_obs, vec![0.5]);
    }

    #[test]
    fn test_one_step_is_identity() {
        let mut window = window(1, 0.9);
        let tr = step(5, 1.5, true);
        assert_eq!(window.push(tr.clone()), Some(tr));
    }

    #[test]
    fn test_nothing_stored_until_window_is_full() {
        let mut buffer = build(10, 4, 0.99);
        for t in 0..3 {
            buffer.push(step(t, 1.0, false)).unwrap();
            assert_eq!(buffer.len(), 0);
            assert_eq!(buffer.window_len(), t + 1);
        }
        buffer.push(step(3, 1.0, false)).unwrap();
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.window_len(), 4);

        let err = buffer.batch(2).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<TroveError>(),
            Some(TroveError::InsufficientData { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn test_len_is_bounded_by_capacity() {
        let mut buffer = build(5, 3, 0.99);
        for t in 0..20 {
            buffer.push(step(t, 1.0, false)).unwrap();
            assert_eq!(buffer.len(), (t + 1).saturating_sub(2).min(5));
        }
    }

    #[test]
    fn test_batch_and_update_are_delegated() {
        let mut buffer = build(16, 3, 0.9);
        for t in 0..18 {
            buffer.push(step(t, 1.0, t % 6 == 5)).unwrap();
        }
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.priority(0), Some(1.0));

        let beta = buffer.beta();
        let batch = buffer.batch(8).unwrap();
        assert!(buffer.beta() > beta);
        let ixs = batch.ix_sample.clone().unwrap();
        let weight = batch.weight.clone().unwrap();
        assert_eq!(weight.len(), 8);
        assert!(weight.iter().all(|&w| w <= 1.0 + 1e-6));

        let ps = vec![2.0; ixs.len()];
        buffer.update_priority(&ixs, &ps).unwrap();
        assert_eq!(buffer.priority(ixs[0]), Some(2.0));

        let err = buffer.update_priority(&[16], &[1.0]).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<TroveError>(),
            Some(TroveError::IndexOutOfRange { index: 16, .. })
        ));
    }

    #[test]
    fn test_window_rejects_invalid_config() {
        for config in [
            NStepConfig::default().nstep(0),
            NStepConfig::default().gamma(1.5),
            NStepConfig::default().gamma(f32::NAN),
        ] {
            let err = NStepWindow::<Vec<f32>, Vec<i64>>::new(&config).err().unwrap();
            assert!(matches!(
                err.downcast_ref::<TroveError>(),
                Some(TroveError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_build_rejects_zero_nstep() {
        let config = NStepPrioritizedReplayBufferConfig::default()
            .nstep_config(NStepConfig::default().nstep(0));
        let err = Buffer::build(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<TroveError>(),
            Some(TroveError::Configuration(_))
        ));
    }
}
