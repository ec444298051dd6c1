//! Replay buffers.
//!
//! # Key Components
//!
//! - [`UniformReplayBuffer`]: ring buffer with uniform sampling without replacement
//! - [`PrioritizedReplayBuffer`]: prioritized experience replay with importance sampling weights
//! - [`NStepPrioritizedReplayBuffer`]: prioritized replay of n-step folded transitions
//! - [`BatchBase`]: column storage of observations and actions
//!
//! # Examples
//!
//! ```rust
//! use trove_core::{
//!     replay_buffer::{PerConfig, PrioritizedReplayBuffer, PrioritizedReplayBufferConfig, Transition},
//!     ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase,
//! };
//!
//! let config = PrioritizedReplayBufferConfig::default()
//!     .capacity(1000)
//!     .seed(42)
//!     .per_config(PerConfig::default().alpha(0.6).beta_0(0.4));
//! let mut buffer = PrioritizedReplayBuffer::<Vec<f32>, Vec<i64>>::build(&config).unwrap();
//!
//! for t in 0..100 {
//!     let tr = Transition::new(vec![t as f32], vec![t % 2], 0.0, vec![t as f32 + 1.0], false);
//!     buffer.push(tr).unwrap();
//! }
//!
//! let batch = buffer.batch(32).unwrap();
//! let ixs = batch.ix_sample.unwrap();
//! let td_errs = vec![0.5; ixs.len()];
//! buffer.update_priority(&ixs, &td_errs).unwrap();
//! ```
mod batch;
mod config;
mod nstep;
mod prioritized;
mod store;
mod uniform;
pub use batch::{BatchBase, GenericTransitionBatch, Transition};
pub use config::{
    NStepConfig, NStepPrioritizedReplayBufferConfig, PerConfig, PrioritizedReplayBufferConfig,
    UniformReplayBufferConfig,
};
pub use nstep::{NStepPrioritizedReplayBuffer, NStepWindow};
pub use prioritized::{IwScheduler, PrioritizedReplayBuffer};
pub use uniform::UniformReplayBuffer;
