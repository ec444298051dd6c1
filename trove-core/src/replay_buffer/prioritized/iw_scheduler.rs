//! Scheduling the exponent of importance weight for PER.
use log::debug;
use serde::{Deserialize, Serialize};

/// Scheduler of the exponent of importance weight for PER.
///
/// $\beta$ grows linearly with the number of sampled batches and is clamped
/// at `beta_final`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct IwScheduler {
    /// Initial value of $\beta$.
    pub beta_0: f32,

    /// Increment of $\beta$ per sampled batch.
    pub beta_increment: f32,

    /// Final value of $\beta$.
    pub beta_final: f32,

    /// Number of sampled batches so far.
    pub n_batches: usize,
}

impl IwScheduler {
    /// Creates a scheduler annealing towards 1.
    pub fn new(beta_0: f32, beta_increment: f32) -> Self {
        Self {
            beta_0,
            beta_increment,
            beta_final: 1.0,
            n_batches: 0,
        }
    }

    /// Gets the exponent of importance sampling weight.
    pub fn beta(&self) -> f32 {
        let beta = self.beta_0 + self.beta_increment * self.n_batches as f32;
        beta.min(self.beta_final)
    }

    /// Counts a sampled batch.
    pub fn add_n_batches(&mut self) {
        let before = self.beta();
        self.n_batches += 1;
        if before < self.beta_final && self.beta() >= self.beta_final {
            debug!("beta reached its final value {} after {} batches", self.beta_final, self.n_batches);
        }
    }
}
