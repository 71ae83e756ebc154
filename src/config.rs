//! Training pipeline configuration.
//!
//! One flat config struct shared by every component, validated once before
//! any thread spawns. How the values get here (file, CLI, hard-coded test
//! fixture) is the caller's business.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::Algorithm;
use crate::replay::replay_buffer::ReplayBufferConfig;
use crate::replay::schedule::BetaSchedule;

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Training algorithm; decided once, dispatched through the policy seam.
    pub algorithm: Algorithm,
    /// Total workers: one exploitation actor plus `n_agents - 1` exploration actors.
    pub n_agents: usize,
    /// Observation dimensionality.
    pub state_dim: usize,
    /// Action dimensionality.
    pub action_dim: usize,
    /// Hidden-layer width of the policy network (checkpoint naming only).
    pub dense_size: usize,

    /// Global episode ceiling for a training run.
    pub num_episodes: u64,
    /// Episode count for an evaluation run.
    pub test_trials: u64,
    /// Per-episode step ceiling.
    pub max_episode_steps: usize,

    /// N-step return horizon.
    pub n_step_returns: usize,
    /// Discount rate (gamma).
    pub discount_rate: f64,

    /// Training batch size.
    pub batch_size: usize,
    /// Replay buffer capacity.
    pub replay_capacity: usize,
    /// Whether replay sampling is prioritized.
    pub prioritized: bool,
    /// Priority exponent (alpha).
    pub priority_alpha: f64,
    /// Importance-correction start (beta anneals from here).
    pub priority_beta_start: f64,
    /// Importance-correction end (beta anneals to here over `num_episodes`).
    pub priority_beta_end: f64,

    /// Episodes between an exploration actor's weight refreshes.
    pub update_agent_interval: u64,
    /// Episodes between forced exploitation checkpoints.
    pub save_interval: u64,
    /// Reward improvement that triggers an immediate checkpoint.
    pub save_reward_threshold: f64,
    /// Learner updates between snapshot publications.
    pub publish_interval: u64,

    /// Capacity of the actor → sampler transition queue.
    pub replay_queue_size: usize,
    /// Capacity of the sampler → learner batch queue.
    pub batch_queue_size: usize,
    /// Sampler loop sleep, milliseconds.
    pub sampler_poll_ms: u64,
    /// Learner batch-wait timeout, milliseconds.
    pub learner_poll_ms: u64,
    /// Metrics hub reporting interval, milliseconds.
    pub metrics_interval_ms: u64,

    /// Persist the replay buffer at shutdown.
    pub save_buffer: bool,
    /// Root directory for checkpoints and buffer dumps.
    pub checkpoint_dir: PathBuf,
    /// Evaluation mode: exploitation actor only, no training.
    pub evaluation: bool,
    /// Render the exploitation actor's environment.
    pub render: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::D4pg,
            n_agents: 4,
            state_dim: 16,
            action_dim: 2,
            dense_size: 256,
            num_episodes: 2_000,
            test_trials: 100,
            max_episode_steps: 500,
            n_step_returns: 5,
            discount_rate: 0.99,
            batch_size: 256,
            replay_capacity: 500_000,
            prioritized: true,
            priority_alpha: 0.6,
            priority_beta_start: 0.4,
            priority_beta_end: 1.0,
            update_agent_interval: 10,
            save_interval: 100,
            save_reward_threshold: 5.0,
            publish_interval: 10,
            replay_queue_size: 64,
            batch_queue_size: 64,
            sampler_poll_ms: 100,
            learner_poll_ms: 100,
            metrics_interval_ms: 50,
            save_buffer: false,
            checkpoint_dir: PathBuf::from("./saved_models"),
            evaluation: false,
            render: false,
        }
    }
}

impl TrainingConfig {
    /// Create a config with defaults for the given algorithm.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    /// Set the number of workers (exploitation + exploration).
    pub fn with_n_agents(mut self, n_agents: usize) -> Self {
        self.n_agents = n_agents;
        self
    }

    /// Set observation and action dimensionality.
    pub fn with_dims(mut self, state_dim: usize, action_dim: usize) -> Self {
        self.state_dim = state_dim;
        self.action_dim = action_dim;
        self
    }

    /// Set the global episode ceiling.
    pub fn with_num_episodes(mut self, num_episodes: u64) -> Self {
        self.num_episodes = num_episodes;
        self
    }

    /// Set the per-episode step ceiling.
    pub fn with_max_episode_steps(mut self, steps: usize) -> Self {
        self.max_episode_steps = steps;
        self
    }

    /// Set the N-step horizon and discount rate.
    pub fn with_n_step(mut self, n: usize, gamma: f64) -> Self {
        self.n_step_returns = n;
        self.discount_rate = gamma;
        self
    }

    /// Set batch size and replay capacity.
    pub fn with_replay(mut self, batch_size: usize, capacity: usize) -> Self {
        self.batch_size = batch_size;
        self.replay_capacity = capacity;
        self
    }

    /// Enable or disable prioritized sampling.
    pub fn with_prioritized(mut self, prioritized: bool) -> Self {
        self.prioritized = prioritized;
        self
    }

    /// Set the checkpoint root directory.
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// Switch to evaluation mode.
    pub fn with_evaluation(mut self, evaluation: bool) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Sampler loop sleep.
    pub fn sampler_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sampler_poll_ms)
    }

    /// Learner batch-wait timeout.
    pub fn learner_poll_interval(&self) -> Duration {
        Duration::from_millis(self.learner_poll_ms)
    }

    /// Metrics reporting interval.
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    /// Number of exploration actors.
    pub fn n_exploration(&self) -> usize {
        self.n_agents.saturating_sub(1)
    }

    /// Deterministic experiment identifier used for checkpoint and dump
    /// directories: algorithm, network width, worker count, prioritization.
    pub fn experiment_signature(&self) -> String {
        format!(
            "{}_{}_A{}_{}",
            self.algorithm.label(),
            self.dense_size,
            self.n_agents,
            if self.prioritized { "P" } else { "N" }
        )
    }

    /// Replay buffer configuration slice of this config.
    pub fn replay_config(&self) -> ReplayBufferConfig {
        ReplayBufferConfig::new(self.replay_capacity)
            .with_prioritized(self.prioritized)
            .with_alpha(self.priority_alpha)
    }

    /// Beta annealing schedule over the training horizon.
    pub fn beta_schedule(&self) -> BetaSchedule {
        BetaSchedule::new(
            self.priority_beta_start,
            self.priority_beta_end,
            self.num_episodes,
        )
    }

    /// Validate the configuration, failing fast before any thread spawns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroField("batch_size"));
        }
        if self.replay_capacity < self.batch_size {
            return Err(ConfigError::CapacityBelowBatch {
                capacity: self.replay_capacity,
                batch_size: self.batch_size,
            });
        }
        if self.n_step_returns == 0 {
            return Err(ConfigError::ZeroField("n_step_returns"));
        }
        if self.max_episode_steps == 0 {
            return Err(ConfigError::ZeroField("max_episode_steps"));
        }
        if !(self.discount_rate > 0.0 && self.discount_rate <= 1.0) {
            return Err(ConfigError::InvalidDiscount(self.discount_rate));
        }
        if self.update_agent_interval == 0 {
            return Err(ConfigError::ZeroField("update_agent_interval"));
        }
        if self.publish_interval == 0 {
            return Err(ConfigError::ZeroField("publish_interval"));
        }
        if self.save_interval == 0 {
            return Err(ConfigError::ZeroField("save_interval"));
        }
        if self.replay_queue_size == 0 {
            return Err(ConfigError::ZeroField("replay_queue_size"));
        }
        if self.batch_queue_size == 0 {
            return Err(ConfigError::ZeroField("batch_queue_size"));
        }
        for (name, value) in [
            ("priority_alpha", self.priority_alpha),
            ("priority_beta_start", self.priority_beta_start),
            ("priority_beta_end", self.priority_beta_end),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidPriorityParam { name, value });
            }
        }
        Ok(())
    }
}

/// Configuration precondition violations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// At least one worker is required.
    NoAgents,
    /// A field that must be positive was zero.
    ZeroField(&'static str),
    /// Replay capacity smaller than the batch size can never sample.
    CapacityBelowBatch { capacity: usize, batch_size: usize },
    /// Discount rate outside (0, 1].
    InvalidDiscount(f64),
    /// A prioritization parameter was negative or non-finite.
    InvalidPriorityParam { name: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoAgents => write!(f, "n_agents must be at least 1"),
            ConfigError::ZeroField(name) => write!(f, "{} must be greater than zero", name),
            ConfigError::CapacityBelowBatch {
                capacity,
                batch_size,
            } => write!(
                f,
                "replay_capacity ({}) must be at least batch_size ({})",
                capacity, batch_size
            ),
            ConfigError::InvalidDiscount(g) => {
                write!(f, "discount_rate must be in (0, 1], got {}", g)
            }
            ConfigError::InvalidPriorityParam { name, value } => {
                write!(f, "{} must be finite and non-negative, got {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(TrainingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = TrainingConfig::new(Algorithm::Sac)
            .with_n_agents(6)
            .with_dims(24, 4)
            .with_num_episodes(500)
            .with_n_step(3, 0.95)
            .with_replay(64, 10_000)
            .with_prioritized(false);

        assert_eq!(config.algorithm, Algorithm::Sac);
        assert_eq!(config.n_agents, 6);
        assert_eq!(config.n_exploration(), 5);
        assert_eq!(config.state_dim, 24);
        assert_eq!(config.n_step_returns, 3);
        assert_eq!(config.batch_size, 64);
        assert!(!config.prioritized);
    }

    #[test]
    fn test_experiment_signature() {
        let config = TrainingConfig::default().with_n_agents(4);
        assert_eq!(config.experiment_signature(), "D4PG_256_A4_P");

        let uniform = config.with_prioritized(false);
        assert_eq!(uniform.experiment_signature(), "D4PG_256_A4_N");
    }

    #[test]
    fn test_validate_rejects_capacity_below_batch() {
        let config = TrainingConfig::default().with_replay(512, 100);
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityBelowBatch {
                capacity: 100,
                batch_size: 512
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_fields() {
        let mut config = TrainingConfig::default();
        config.n_step_returns = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroField("n_step_returns"))
        );

        let mut config = TrainingConfig::default();
        config.n_agents = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoAgents));
    }

    #[test]
    fn test_validate_rejects_bad_discount() {
        let mut config = TrainingConfig::default();
        config.discount_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDiscount(_))
        ));
    }

    #[test]
    fn test_beta_schedule_from_config() {
        let config = TrainingConfig::default().with_num_episodes(100);
        let schedule = config.beta_schedule();
        assert_eq!(schedule.beta_at(0), config.priority_beta_start);
        assert_eq!(schedule.beta_at(100), config.priority_beta_end);
    }
}
