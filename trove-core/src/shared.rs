//! A replay buffer shared between a producer and a consumer thread.
use crate::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase, TroveError};
use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a replay buffer behind a single lock.
///
/// Pushing, sampling and priority updates are mutually exclusive, so a
/// priority update never interleaves with the sampling of a batch.
///
/// # Examples
///
/// ```rust
/// use std::thread;
/// use trove_core::{
///     replay_buffer::{Transition, UniformReplayBuffer, UniformReplayBufferConfig},
///     ReplayBufferBase, SharedReplayBuffer,
/// };
///
/// let config = UniformReplayBufferConfig::default().capacity(100);
/// let buffer = UniformReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
/// let shared = SharedReplayBuffer::new(buffer);
///
/// let producer = {
///     let shared = shared.clone();
///     thread::spawn(move || {
///         for t in 0..10 {
///             let tr = Transition::new(vec![t as f32], vec![0], 0.0, vec![0.0], false);
///             shared.push(tr).unwrap();
///         }
///     })
/// };
/// producer.join().unwrap();
///
/// assert_eq!(shared.len().unwrap(), 10);
/// let batch = shared.batch(5).unwrap();
/// assert_eq!(batch.len(), 5);
/// ```
pub struct SharedReplayBuffer<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedReplayBuffer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R> SharedReplayBuffer<R> {
    /// Wraps a replay buffer.
    pub fn new(buffer: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, R>> {
        Ok(self.inner.lock().map_err(|_| TroveError::LockPoisoned)?)
    }

    /// Runs `f` with exclusive access to the buffer.
    pub fn with<T>(&self, f: impl FnOnce(&mut R) -> T) -> Result<T> {
        let mut buffer = self.lock()?;
        Ok(f(&mut buffer))
    }
}

impl<R: ExperienceBufferBase> SharedReplayBuffer<R> {
    /// Pushes a transition.
    pub fn push(&self, tr: R::Item) -> Result<()> {
        self.lock()?.push(tr)
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

impl<R: ReplayBufferBase> SharedReplayBuffer<R> {
    /// Samples a batch.
    pub fn batch(&self, size: usize) -> Result<R::Batch> {
        self.lock()?.batch(size)
    }
}

impl<R: PrioritizedReplayBufferBase> SharedReplayBuffer<R> {
    /// Overwrites priorities of the slots in `ixs`.
    pub fn update_priority(&self, ixs: &[usize], priorities: &[f32]) -> Result<()> {
        self.lock()?.update_priority(ixs, priorities)
    }
}
