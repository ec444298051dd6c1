//! Ring storage of transitions shared by all replay buffers.
use super::{BatchBase, GenericTransitionBatch, Transition};

/// Fixed-capacity columnar ring storage.
///
/// While the store is not full, the write cursor `i` equals the number of
/// stored transitions. Once full, each push overwrites slot `i`, the oldest
/// transition, and the cursor advances modulo `capacity`.
pub(crate) struct TransitionStore<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Current number of stored transitions.
    size: usize,

    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_done: Vec<i8>,
}

impl<O, A> TransitionStore<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            i: 0,
            size: 0,
            obs: O::new(capacity),
            act: A::new(capacity),
            next_obs: O::new(capacity),
            reward: vec![0.; capacity],
            is_done: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    /// Slot the next push will write to.
    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.i
    }

    /// Writes `tr` into the slot under the cursor and returns that slot.
    ///
    /// # Panics
    ///
    /// Panics if a column of `tr` does not hold exactly one record.
    pub fn push(&mut self, tr: Transition<O, A>) -> usize {
        assert!(
            tr.obs.len() == 1 && tr.act.len() == 1 && tr.next_obs.len() == 1,
            "a transition must hold exactly one record per column, got obs={}, act={}, next_obs={}",
            tr.obs.len(),
            tr.act.len(),
            tr.next_obs.len()
        );

        let ix = self.i;
        self.obs.push(ix, tr.obs);
        self.act.push(ix, tr.act);
        self.next_obs.push(ix, tr.next_obs);
        self.reward[ix] = tr.reward;
        self.is_done[ix] = tr.is_done as i8;

        self.i = (self.i + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }
        ix
    }

    /// Gathers the transitions at `ixs`. Indices must be below `len()`.
    pub fn gather(&self, ixs: &[usize]) -> GenericTransitionBatch<O, A> {
        GenericTransitionBatch {
            obs: self.obs.sample(ixs),
            act: self.act.sample(ixs),
            next_obs: self.next_obs.sample(ixs),
            reward: ixs.iter().map(|&ix| self.reward[ix]).collect(),
            is_done: ixs.iter().map(|&ix| self.is_done[ix]).collect(),
            weight: None,
            ix_sample: Some(ixs.to_vec()),
        }
    }

    /// Returns the number of terminal flags in the stored transitions.
    pub fn num_done_flags(&self) -> usize {
        self.is_done[..self.size]
            .iter()
            .map(|&is_done| is_done as usize)
            .sum()
    }

    /// Returns the sum of rewards of the stored transitions.
    pub fn sum_rewards(&self) -> f32 {
        self.reward[..self.size].iter().sum()
    }
}
