//! # apex_rl: Multi-Actor Distributed RL Training Pipeline
//!
//! Actor-learner training on a single host: parallel actor threads
//! generate experience, a sampler coordinator buffers and prioritizes it,
//! a learner consumes batches and redistributes policy weights.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Thread 0            Thread 1            Thread N               │
//! │  ┌────────────┐      ┌────────────┐      ┌────────────┐         │
//! │  │Exploitation│      │Exploration │      │Exploration │         │
//! │  │  actor     │      │  actor 1   │      │  actor N   │         │
//! │  │(checkpoint)│      │ (OU noise) │      │ (OU noise) │         │
//! │  └────────────┘      └─────┬──────┘      └─────┬──────┘         │
//! │                            └────────┬──────────┘                │
//! │                                     ▼ raw transition queue      │
//! │                          ┌──────────────────┐                   │
//! │                          │SamplerCoordinator│                   │
//! │                          │  N-step replay   │                   │
//! │                          │  prioritized     │                   │
//! │                          └────────┬─────────┘                   │
//! │                                   ▼ batch queue                 │
//! │   snapshot slot          ┌──────────────────┐                   │
//! │  ◄───────────────────────│     Learner      │                   │
//! │  (latest-wins weights)   │ (optimize step)  │───► priorities    │
//! │                          └──────────────────┘     back to buffer│
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every cross-thread handoff is a bounded queue with drop-on-full or a
//! timeout-and-recheck receive; one shared flag cancels everything.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use apex_rl::{Algorithm, TrainingConfig, TrainingRunner, ConsoleSink};
//!
//! let config = TrainingConfig::new(Algorithm::D4pg)
//!     .with_n_agents(4)
//!     .with_dims(16, 2)
//!     .with_num_episodes(2_000);
//!
//! let runner = TrainingRunner::new(config)?;
//! let report = runner.run(
//!     || MyPolicy::new(16, 2),
//!     |index| MyEnv::new(index),
//!     Box::new(ConsoleSink::new(100)),
//! )?;
//! ```

pub mod actors;
pub mod checkpoint;
pub mod config;
pub mod core;
pub mod environment;
pub mod learner;
pub mod metrics;
pub mod policy;
pub mod replay;
pub mod runners;
pub mod sampler;

// Re-export commonly used types
pub use crate::core::counters::{
    shared_counters, AgentGauge, CountersSnapshot, EvalGauge, LossGauge, PipelineGauge,
    SharedCounters, SharedCountersHandle,
};
pub use crate::core::nstep::NStepAccumulator;
pub use crate::core::snapshot_slot::{
    snapshot_slot, PolicySnapshot, SharedSnapshotSlot, SnapshotSlot,
};
pub use crate::core::transition::{ActionVector, NStepTransition, Observation, Transition};

pub use replay::replay_buffer::{
    PriorityUpdate, ReplayBuffer, ReplayBufferConfig, ReplayEntry, ReplayError, TrainingBatch,
};
pub use replay::schedule::BetaSchedule;

pub use actors::actor::{Actor, ActorHandle, ActorRole, ActorShared};
pub use actors::noise::{OuNoise, OuNoiseConfig};

pub use sampler::{SamplerCoordinator, SamplerHandle, SamplerShared};

pub use learner::learner::{Learner, LearnerHandle, LearnerShared};

pub use checkpoint::checkpointer::{
    CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig,
};

pub use metrics::hub::{MetricsHandle, MetricsHub};
pub use metrics::sink::{ConsoleSink, CsvSink, MultiSink, TelemetrySink};

pub use config::{ConfigError, TrainingConfig};
pub use environment::{Environment, StepResult};
pub use policy::{
    Algorithm, LearnReport, Policy, PolicyError, TrainablePolicy, UnknownAlgorithm,
};
pub use runners::runner::{TrainingError, TrainingReport, TrainingRunner};
