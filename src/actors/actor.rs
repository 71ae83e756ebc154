//! Actor workers driving environment interaction.
//!
//! Two roles share one loop:
//! - `Exploration` actors perturb actions with Ornstein–Uhlenbeck noise
//!   (for deterministic-policy algorithms) and feed the shared replay
//!   stream. They periodically refresh their policy from the learner's
//!   snapshot slot.
//! - The `Exploitation` actor selects deterministically, never writes the
//!   replay stream, and persists checkpoints when its episode reward sets
//!   a new best or on a fixed episode cadence. In evaluation mode it also
//!   reports trajectory position samples.
//!
//! Every queue interaction is non-blocking: a full replay queue drops the
//! transition, an empty snapshot slot means "no update this round".

use crossbeam_channel::Sender;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::checkpoint::checkpointer::Checkpointer;
use crate::config::TrainingConfig;
use crate::core::counters::SharedCountersHandle;
use crate::core::nstep::NStepAccumulator;
use crate::core::snapshot_slot::SharedSnapshotSlot;
use crate::core::transition::{ActionVector, NStepTransition, Transition};
use crate::environment::Environment;
use crate::policy::Policy;

use super::noise::{OuNoise, OuNoiseConfig};

/// Worker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    /// Noisy worker feeding the replay stream.
    Exploration,
    /// Deterministic worker used for checkpointing and evaluation.
    Exploitation,
}

impl ActorRole {
    /// Whether this role contributes experience to the replay stream.
    pub fn is_exploration(&self) -> bool {
        matches!(self, ActorRole::Exploration)
    }

    /// Thread-name label.
    fn label(&self) -> &'static str {
        match self {
            ActorRole::Exploration => "Explore",
            ActorRole::Exploitation => "Exploit",
        }
    }
}

/// Shared handles an actor needs from the orchestrator.
#[derive(Clone)]
pub struct ActorShared {
    pub counters: SharedCountersHandle,
    pub raw_tx: Sender<NStepTransition>,
    pub snapshot_slot: SharedSnapshotSlot,
}

/// Handle for a spawned actor thread.
pub struct ActorHandle {
    thread: JoinHandle<()>,
    /// Worker index of the spawned actor.
    pub index: usize,
}

impl ActorHandle {
    /// Wait for the actor thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// One environment-interaction worker.
pub struct Actor<P: Policy, E: Environment> {
    config: TrainingConfig,
    role: ActorRole,
    index: usize,
    policy: P,
    env: E,
    noise: OuNoise,
    accumulator: NStepAccumulator,
    checkpointer: Option<Checkpointer>,
    local_episode: u64,
    last_snapshot_version: u64,
    best_reward: f64,
}

impl<P: Policy, E: Environment> Actor<P, E> {
    /// Create an actor with its own policy copy and environment.
    pub fn new(config: TrainingConfig, role: ActorRole, index: usize, policy: P, env: E) -> Self {
        let noise = OuNoise::new(config.action_dim, OuNoiseConfig::default());
        let accumulator = NStepAccumulator::new(config.n_step_returns, config.discount_rate);
        Self {
            config,
            role,
            index,
            policy,
            env,
            noise,
            accumulator,
            checkpointer: None,
            local_episode: 0,
            last_snapshot_version: 0,
            best_reward: f64::NEG_INFINITY,
        }
    }

    /// Attach a checkpointer (exploitation actors only).
    pub fn with_checkpointer(mut self, checkpointer: Checkpointer) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Override the noise configuration.
    pub fn with_noise_config(mut self, noise_config: OuNoiseConfig) -> Self {
        self.noise = OuNoise::new(self.config.action_dim, noise_config);
        self
    }

    /// Run episodes until the training flag clears or the episode ceiling
    /// is reached. Returns the final policy (useful after evaluation).
    pub fn run(mut self, shared: ActorShared) -> P {
        loop {
            if !shared.counters.training_active() {
                break;
            }
            if self.config.evaluation {
                if self.local_episode >= self.config.test_trials {
                    break;
                }
            } else if shared.counters.global_episode() >= self.config.num_episodes {
                break;
            }

            self.local_episode += 1;
            let started = Instant::now();
            let episode_reward = self.run_episode(&shared);
            let episode_secs = started.elapsed().as_secs_f64();

            shared.counters.increment_global_episode();
            shared.counters.record_agent_episode(
                self.index,
                episode_reward,
                episode_secs,
                self.local_episode,
            );

            if !self.config.evaluation {
                match self.role {
                    ActorRole::Exploitation => self.maybe_checkpoint(episode_reward),
                    ActorRole::Exploration => {
                        if self.local_episode % self.config.update_agent_interval == 0 {
                            self.refresh_policy(&shared);
                        }
                    }
                }
            }
        }

        // In evaluation there is no learner to end the run.
        if self.config.evaluation {
            shared.counters.set_training_active(false);
        }
        self.policy
    }

    /// Spawn the actor on a named thread.
    pub fn spawn(self, shared: ActorShared) -> ActorHandle
    where
        P: 'static,
        E: 'static,
    {
        let index = self.index;
        let name = format!("{}-Actor-{}", self.role.label(), index);
        let thread = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                self.run(shared);
            })
            .expect("failed to spawn actor thread");
        ActorHandle { thread, index }
    }

    fn run_episode(&mut self, shared: &ActorShared) -> f64 {
        let mut state = self.env.reset();
        self.noise.reset(self.noise_seed());
        self.accumulator.reset();

        let mut episode_reward = 0.0f64;
        let mut done = false;
        let mut steps = 0usize;

        while !done && steps < self.config.max_episode_steps && shared.counters.training_active() {
            if self.config.render && self.role == ActorRole::Exploitation {
                self.env.render();
            }

            let action = self.select_action(&state, steps);
            let result = self.env.step(&action);
            episode_reward += result.reward;

            if !self.config.evaluation {
                let emitted = self.accumulator.push(
                    Transition::new(state, action, result.reward),
                    &result.observation,
                    result.done,
                );
                if let Some(t) = emitted {
                    self.forward(t, shared);
                }
            }

            done = result.done;
            state = result.observation;
            steps += 1;
            shared.counters.increment_global_step();

            if self.config.evaluation {
                if let Some([x, y]) = self.env.position() {
                    shared.counters.record_eval_position(x, y);
                }
            }
        }

        // Single flush path for natural termination and step-ceiling
        // truncation alike; the final done flag distinguishes them.
        if !self.config.evaluation {
            for t in self.accumulator.flush(&state, done) {
                self.forward(t, shared);
            }
        }

        episode_reward
    }

    fn select_action(&mut self, state: &[f32], step: usize) -> ActionVector {
        match self.role {
            ActorRole::Exploitation => self.policy.forward(state, true),
            ActorRole::Exploration => {
                let action = self.policy.forward(state, false);
                if self.config.algorithm.uses_action_noise() {
                    self.noise.apply(&action, step)
                } else {
                    action
                }
            }
        }
    }

    /// Forward one N-step transition to the replay stream.
    ///
    /// Only exploration actors write; a full queue silently drops the
    /// transition (bounded-buffer backpressure).
    fn forward(&self, transition: NStepTransition, shared: &ActorShared) {
        if self.role.is_exploration() {
            let _ = shared.raw_tx.try_send(transition);
        }
    }

    /// Non-blocking weight refresh from the snapshot slot.
    fn refresh_policy(&mut self, shared: &ActorShared) {
        if !shared.counters.training_active() {
            return;
        }
        if let Some((snapshot, version)) = shared.snapshot_slot.peek_versioned() {
            if version != self.last_snapshot_version {
                self.policy.apply_parameters(snapshot.tensors());
                self.last_snapshot_version = version;
            }
        }
    }

    fn maybe_checkpoint(&mut self, episode_reward: f64) {
        let outperformed = episode_reward - self.best_reward > self.config.save_reward_threshold;
        let cadence = self.local_episode % self.config.save_interval == 0;
        if !outperformed && !cadence {
            return;
        }
        if episode_reward > self.best_reward {
            self.best_reward = episode_reward;
        }
        if let Some(checkpointer) = &mut self.checkpointer {
            let blob = self.policy.state_bytes();
            if let Err(e) = checkpointer.save(&blob, self.local_episode, self.best_reward) {
                eprintln!("agent {}: checkpoint save failed: {}", self.index, e);
            }
        }
    }

    fn noise_seed(&self) -> u64 {
        // Distinct stream per (worker, episode).
        (self.index as u64)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(self.local_episode)
    }
}
