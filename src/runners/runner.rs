//! Training orchestration: wiring, spawning, joining.
//!
//! The runner owns process lifecycle. It creates the shared state
//! (counters, snapshot slot, bounded queues), spawns one named thread per
//! component, and joins them all before returning. Shutdown propagates
//! through the single training-active flag: the learner clears it when the
//! episode ceiling is reached (the exploitation actor does in evaluation
//! mode), and every loop observes it within one iteration.
//!
//! ```text
//! Actors ──raw queue──> Sampler ──batch queue──> Learner
//!   ▲                      ▲                        │
//!   │                      └──── priority queue ────┤
//!   └────────────── snapshot slot ──────────────────┘
//! ```

use crossbeam_channel::bounded;
use std::fmt;

use crate::actors::actor::{Actor, ActorRole, ActorShared};
use crate::checkpoint::checkpointer::{CheckpointError, Checkpointer, CheckpointerConfig};
use crate::config::{ConfigError, TrainingConfig};
use crate::core::counters::shared_counters;
use crate::core::snapshot_slot::snapshot_slot;
use crate::environment::Environment;
use crate::learner::learner::{Learner, LearnerShared};
use crate::metrics::hub::MetricsHub;
use crate::metrics::sink::TelemetrySink;
use crate::policy::TrainablePolicy;
use crate::sampler::{SamplerCoordinator, SamplerShared};

/// Error from orchestrating a training run.
#[derive(Debug)]
pub enum TrainingError {
    /// Configuration failed validation.
    Config(ConfigError),
    /// Checkpoint directory could not be prepared.
    Checkpoint(CheckpointError),
    /// A worker thread panicked.
    WorkerPanicked(&'static str),
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Config(e) => write!(f, "configuration error: {}", e),
            TrainingError::Checkpoint(e) => write!(f, "checkpoint error: {}", e),
            TrainingError::WorkerPanicked(who) => write!(f, "{} thread panicked", who),
        }
    }
}

impl std::error::Error for TrainingError {}

impl From<ConfigError> for TrainingError {
    fn from(e: ConfigError) -> Self {
        TrainingError::Config(e)
    }
}

impl From<CheckpointError> for TrainingError {
    fn from(e: CheckpointError) -> Self {
        TrainingError::Checkpoint(e)
    }
}

/// Final counter totals of a completed run.
#[derive(Debug, Clone, Copy)]
pub struct TrainingReport {
    /// Episodes completed across all workers.
    pub global_episode: u64,
    /// Environment steps across all workers.
    pub global_step: u64,
    /// Learner optimization steps performed.
    pub update_step: u64,
}

/// Spawns and joins the full actor-learner pipeline.
pub struct TrainingRunner {
    config: TrainingConfig,
}

impl TrainingRunner {
    /// Create a runner, failing fast on invalid configuration.
    pub fn new(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the pipeline to completion and report final counters.
    ///
    /// `policy_factory` is called once per worker plus once for the
    /// learner, so every component owns an independent policy copy.
    /// `env_factory` is called once per worker with its index.
    ///
    /// In evaluation mode only the exploitation actor and the metrics hub
    /// run; the replay pipeline stays down.
    pub fn run<P, E>(
        &self,
        policy_factory: impl Fn() -> P,
        env_factory: impl Fn(usize) -> E,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<TrainingReport, TrainingError>
    where
        P: TrainablePolicy + 'static,
        E: Environment + 'static,
    {
        let config = &self.config;
        let counters = shared_counters(config.n_agents);
        let slot = snapshot_slot();

        let (raw_tx, raw_rx) = bounded(config.replay_queue_size);
        let (batch_tx, batch_rx) = bounded(config.batch_queue_size);
        let (priority_tx, priority_rx) = bounded(config.replay_queue_size);

        println!(
            "starting {} run {} ({} exploration + 1 exploitation)",
            if config.evaluation { "evaluation" } else { "training" },
            config.experiment_signature(),
            if config.evaluation { 0 } else { config.n_exploration() },
        );

        let metrics_handle =
            MetricsHub::new(config.metrics_interval(), sink).spawn(counters.clone());

        let (sampler_handle, learner_handle) = if config.evaluation {
            (None, None)
        } else {
            let sampler = SamplerCoordinator::new(config.clone()).spawn(SamplerShared {
                counters: counters.clone(),
                raw_rx,
                batch_tx,
                batch_rx: batch_rx.clone(),
                priority_rx,
            });
            let learner = Learner::new(config.clone(), policy_factory()).spawn(LearnerShared {
                counters: counters.clone(),
                batch_rx,
                priority_tx,
                snapshot_slot: slot.clone(),
            });
            (Some(sampler), Some(learner))
        };

        let actor_shared = ActorShared {
            counters: counters.clone(),
            raw_tx,
            snapshot_slot: slot,
        };

        let mut actor_handles = Vec::with_capacity(config.n_agents);

        let mut exploitation = Actor::new(
            config.clone(),
            ActorRole::Exploitation,
            0,
            policy_factory(),
            env_factory(0),
        );
        if !config.evaluation {
            let checkpoint_dir = config.checkpoint_dir.join(config.experiment_signature());
            let checkpointer = Checkpointer::new(CheckpointerConfig::new(checkpoint_dir))?;
            exploitation = exploitation.with_checkpointer(checkpointer);
        }
        actor_handles.push(exploitation.spawn(actor_shared.clone()));

        if !config.evaluation {
            for index in 1..config.n_agents {
                let actor = Actor::new(
                    config.clone(),
                    ActorRole::Exploration,
                    index,
                    policy_factory(),
                    env_factory(index),
                );
                actor_handles.push(actor.spawn(actor_shared.clone()));
            }
        }
        drop(actor_shared);

        // Join-all: nothing returns until every component has observed the
        // cleared flag and exited.
        let mut panicked = None;
        for handle in actor_handles {
            if handle.join().is_err() {
                panicked = Some("actor");
            }
        }
        // All actors have exited, so no more experience is coming; clear
        // the flag in case none of them got to (e.g. an actor panicked
        // before the episode ceiling was reached).
        counters.set_training_active(false);
        if let Some(handle) = learner_handle {
            if handle.join().is_err() {
                panicked = Some("learner");
            }
        }
        if let Some(handle) = sampler_handle {
            if handle.join().is_err() {
                panicked = Some("sampler");
            }
        }
        if metrics_handle.join().is_err() {
            panicked = Some("metrics");
        }

        if let Some(who) = panicked {
            return Err(TrainingError::WorkerPanicked(who));
        }

        let snapshot = counters.snapshot();
        println!(
            "run complete: {} episodes, {} env steps, {} updates",
            snapshot.global_episode, snapshot.global_step, snapshot.update_step
        );

        Ok(TrainingReport {
            global_episode: snapshot.global_episode,
            global_step: snapshot.global_step,
            update_step: snapshot.update_step,
        })
    }
}
