#![warn(missing_docs)]
//! Experience replay buffers for reinforcement learning.
//!
//! Three buffers share the same interfaces:
//! [`ExperienceBufferBase`] for pushing transitions, [`ReplayBufferBase`] for
//! sampling batches and [`PrioritizedReplayBufferBase`] for reporting new
//! priorities. Buffers are single-owner; wrap one in a [`SharedReplayBuffer`]
//! to push and sample from different threads.
mod base;
mod error;
pub mod replay_buffer;
mod shared;
pub use base::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase};
pub use error::TroveError;
pub use shared::SharedReplayBuffer;
