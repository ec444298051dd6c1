//! Configurations of the replay buffers.
//!
//! All configurations can be written to and read from YAML files, and are
//! validated when a buffer is built.
use crate::TroveError;
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path)?;
    let rdr = BufReader::new(file);
    let b = serde_yaml::from_reader(rdr)?;
    Ok(b)
}

fn save_yaml<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(serde_yaml::to_string(value)?.as_bytes())?;
    Ok(())
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(TroveError::Configuration("capacity must be positive".to_string()).into());
    }
    Ok(())
}

fn check_unit_interval(name: &str, v: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(TroveError::Configuration(format!("{} must be in [0, 1], got {}", name, v)).into());
    }
    Ok(())
}

fn check_non_negative(name: &str, v: f32) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(TroveError::Configuration(format!(
            "{} must be finite and non-negative, got {}",
            name, v
        ))
        .into());
    }
    Ok(())
}

/// Configuration of [`UniformReplayBuffer`](super::UniformReplayBuffer).
///
/// ```rust
/// use trove_core::replay_buffer::UniformReplayBufferConfig;
///
/// let config = UniformReplayBufferConfig::default()
///     .capacity(10000)
///     .seed(42);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct UniformReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,
}

impl Default for UniformReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
        }
    }
}

impl UniformReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        check_capacity(self.capacity)
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }
}

/// Configuration for Prioritized Experience Replay (PER).
///
/// A transition with priority $p_i$ is sampled with probability
/// $P(i) = (p_i + \epsilon)^\alpha / \sum_k (p_k + \epsilon)^\alpha$,
/// and its importance sampling weight is $(N P(i))^{-\beta}$, normalized by the
/// maximum in the batch. $\beta$ starts at `beta_0` and grows by
/// `beta_increment` after every sampled batch until it reaches 1.
///
/// ```rust
/// use trove_core::replay_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_0(0.4)
///     .beta_increment(0.001);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent for prioritization. A value of 0 results in uniform sampling.
    pub alpha: f32,

    /// Initial value of the importance sampling exponent.
    pub beta_0: f32,

    /// Increment of the importance sampling exponent per sampled batch.
    pub beta_increment: f32,

    /// Added to every priority so that zero-priority transitions can still be sampled.
    pub epsilon: f32,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_0: 0.4,
            beta_increment: 0.001,
            epsilon: 1e-5,
        }
    }
}

impl PerConfig {
    /// Sets the prioritization exponent `alpha`.
    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance sampling exponent `beta_0`.
    pub fn beta_0(mut self, beta_0: f32) -> Self {
        self.beta_0 = beta_0;
        self
    }

    /// Sets the per-batch increment of the importance sampling exponent.
    pub fn beta_increment(mut self, beta_increment: f32) -> Self {
        self.beta_increment = beta_increment;
        self
    }

    /// Sets the priority floor `epsilon`.
    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("alpha", self.alpha)?;
        check_unit_interval("beta_0", self.beta_0)?;
        check_non_negative("beta_increment", self.beta_increment)?;
        check_non_negative("epsilon", self.epsilon)
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
///
/// ```rust
/// use trove_core::replay_buffer::{PerConfig, PrioritizedReplayBufferConfig};
///
/// let config = PrioritizedReplayBufferConfig::default()
///     .capacity(100_000)
///     .per_config(PerConfig::default().alpha(0.7));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PrioritizedReplayBufferConfig {
    /// Maximum number of transitions that can be stored in the buffer.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Prioritization parameters.
    pub per_config: PerConfig,
}

impl Default for PrioritizedReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            per_config: PerConfig::default(),
        }
    }
}

impl PrioritizedReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the prioritization parameters.
    pub fn per_config(mut self, per_config: PerConfig) -> Self {
        self.per_config = per_config;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        check_capacity(self.capacity)?;
        self.per_config.validate()
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }
}

/// Parameters of n-step folding.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NStepConfig {
    /// Number of consecutive transitions folded into one.
    pub nstep: usize,

    /// Discount factor applied to the rewards of later steps.
    pub gamma: f32,
}

impl Default for NStepConfig {
    fn default() -> Self {
        Self {
            nstep: 3,
            gamma: 0.99,
        }
    }
}

impl NStepConfig {
    /// Sets the depth of the folding window.
    pub fn nstep(mut self, nstep: usize) -> Self {
        self.nstep = nstep;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.nstep == 0 {
            return Err(TroveError::Configuration("nstep must be positive".to_string()).into());
        }
        check_unit_interval("gamma", self.gamma)
    }
}

/// Configuration of [`NStepPrioritizedReplayBuffer`](super::NStepPrioritizedReplayBuffer).
///
/// ```rust
/// use trove_core::replay_buffer::{NStepConfig, NStepPrioritizedReplayBufferConfig};
///
/// let config = NStepPrioritizedReplayBufferConfig::default()
///     .capacity(100_000)
///     .nstep_config(NStepConfig::default().nstep(5).gamma(0.95));
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NStepPrioritizedReplayBufferConfig {
    /// Maximum number of folded transitions that can be stored in the buffer.
    pub capacity: usize,

    /// Random seed used for sampling transitions.
    pub seed: u64,

    /// Prioritization parameters.
    pub per_config: PerConfig,

    /// Folding parameters.
    pub nstep_config: NStepConfig,
}

impl Default for NStepPrioritizedReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            seed: 42,
            per_config: PerConfig::default(),
            nstep_config: NStepConfig::default(),
        }
    }
}

impl NStepPrioritizedReplayBufferConfig {
    /// Sets the capacity of the replay buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed for sampling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the prioritization parameters.
    pub fn per_config(mut self, per_config: PerConfig) -> Self {
        self.per_config = per_config;
        self
    }

    /// Sets the folding parameters.
    pub fn nstep_config(mut self, nstep_config: NStepConfig) -> Self {
        self.nstep_config = nstep_config;
        self
    }

    /// Checks the parameters.
    pub fn validate(&self) -> Result<()> {
        check_capacity(self.capacity)?;
        self.per_config.validate()?;
        self.nstep_config.validate()
    }

    /// Configuration of the prioritized buffer holding the folded transitions.
    pub(crate) fn prioritized(&self) -> PrioritizedReplayBufferConfig {
        PrioritizedReplayBufferConfig {
            capacity: self.capacity,
            seed: self.seed,
            per_config: self.per_config.clone(),
        }
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_yaml(path)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_yaml(self, path)
    }
}
