//! Core interfaces.
mod replay_buffer;
pub use replay_buffer::{ExperienceBufferBase, PrioritizedReplayBufferBase, ReplayBufferBase};
