//! Shared training counters and gauges.
//!
//! One process-wide state object created by the orchestrator before any
//! worker spawns and read by the metrics hub. Independent scalars (the
//! training-active flag, global episode/step counts, the learner's update
//! step) are lock-free atomics. Compound fields that must be read
//! consistently together — a worker's reward/timing/episode triple, the
//! pipeline depth gauges, the loss pair — live behind one coarse mutex so
//! a reader never observes a half-updated group.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Last-episode gauge for one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentGauge {
    /// Reward of the worker's most recent episode.
    pub reward: f64,
    /// Wall-clock duration of that episode in seconds.
    pub episode_secs: f64,
    /// The worker's local episode index.
    pub episode: u64,
}

/// Learner loss and timing gauge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossGauge {
    /// Policy loss of the most recent update.
    pub policy_loss: f64,
    /// Value loss of the most recent update.
    pub value_loss: f64,
    /// Wall-clock duration of that update in seconds.
    pub update_secs: f64,
}

/// Queue and buffer occupancy gauge, published by the sampler.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineGauge {
    /// Pending transitions in the actor → sampler queue.
    pub raw_queue_depth: usize,
    /// Pending batches in the sampler → learner queue.
    pub batch_queue_depth: usize,
    /// Replay buffer occupancy.
    pub buffer_len: usize,
}

/// Trajectory position sample reported in evaluation mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalGauge {
    pub x: f64,
    pub y: f64,
}

/// Compound gauges guarded by the coarse lock.
#[derive(Debug, Clone)]
struct GaugeBoard {
    agents: Vec<AgentGauge>,
    losses: LossGauge,
    pipeline: PipelineGauge,
    eval: EvalGauge,
}

/// A consistent point-in-time view of all counters and gauges.
#[derive(Debug, Clone)]
pub struct CountersSnapshot {
    pub global_episode: u64,
    pub global_step: u64,
    pub update_step: u64,
    pub agents: Vec<AgentGauge>,
    pub losses: LossGauge,
    pub pipeline: PipelineGauge,
    pub eval: EvalGauge,
}

/// Process-wide shared counters.
pub struct SharedCounters {
    training_active: AtomicBool,
    global_episode: AtomicU64,
    global_step: AtomicU64,
    update_step: AtomicU64,
    board: Mutex<GaugeBoard>,
}

impl SharedCounters {
    /// Create counters for `n_agents` workers, with training active.
    pub fn new(n_agents: usize) -> Self {
        Self {
            training_active: AtomicBool::new(true),
            global_episode: AtomicU64::new(0),
            global_step: AtomicU64::new(0),
            update_step: AtomicU64::new(0),
            board: Mutex::new(GaugeBoard {
                agents: vec![AgentGauge::default(); n_agents],
                losses: LossGauge::default(),
                pipeline: PipelineGauge::default(),
                eval: EvalGauge::default(),
            }),
        }
    }

    /// The global cancellation flag, observed cooperatively by every loop.
    pub fn training_active(&self) -> bool {
        self.training_active.load(Ordering::Acquire)
    }

    /// Set or clear the cancellation flag.
    pub fn set_training_active(&self, active: bool) {
        self.training_active.store(active, Ordering::Release);
    }

    /// Increment the global episode count, returning the new value.
    pub fn increment_global_episode(&self) -> u64 {
        self.global_episode.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total episodes completed across all workers.
    pub fn global_episode(&self) -> u64 {
        self.global_episode.load(Ordering::Relaxed)
    }

    /// Increment the global environment step count.
    pub fn increment_global_step(&self) -> u64 {
        self.global_step.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Total environment steps across all workers.
    pub fn global_step(&self) -> u64 {
        self.global_step.load(Ordering::Relaxed)
    }

    /// Increment the learner's update step, returning the new value.
    pub fn increment_update_step(&self) -> u64 {
        self.update_step.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Learner optimization steps performed so far.
    pub fn update_step(&self) -> u64 {
        self.update_step.load(Ordering::Relaxed)
    }

    /// Record a worker's completed episode as one consistent triple.
    ///
    /// Out-of-range worker indices are ignored.
    pub fn record_agent_episode(&self, agent: usize, reward: f64, episode_secs: f64, episode: u64) {
        let mut board = self.board.lock();
        if let Some(gauge) = board.agents.get_mut(agent) {
            *gauge = AgentGauge {
                reward,
                episode_secs,
                episode,
            };
        }
    }

    /// Record the learner's latest loss pair and update timing.
    pub fn record_losses(&self, policy_loss: f64, value_loss: f64, update_secs: f64) {
        self.board.lock().losses = LossGauge {
            policy_loss,
            value_loss,
            update_secs,
        };
    }

    /// Publish queue/buffer occupancy, as one consistent group.
    pub fn set_pipeline_gauges(&self, raw_queue_depth: usize, batch_queue_depth: usize, buffer_len: usize) {
        self.board.lock().pipeline = PipelineGauge {
            raw_queue_depth,
            batch_queue_depth,
            buffer_len,
        };
    }

    /// Record an evaluation-mode trajectory position sample.
    pub fn record_eval_position(&self, x: f64, y: f64) {
        self.board.lock().eval = EvalGauge { x, y };
    }

    /// Gauge for one worker, if the index is in range.
    pub fn agent_gauge(&self, agent: usize) -> Option<AgentGauge> {
        self.board.lock().agents.get(agent).copied()
    }

    /// A consistent snapshot of everything, for the metrics hub.
    ///
    /// Compound gauges are read under the single coarse lock; the atomic
    /// scalars are sampled alongside.
    pub fn snapshot(&self) -> CountersSnapshot {
        let board = self.board.lock();
        CountersSnapshot {
            global_episode: self.global_episode(),
            global_step: self.global_step(),
            update_step: self.update_step(),
            agents: board.agents.clone(),
            losses: board.losses,
            pipeline: board.pipeline,
            eval: board.eval,
        }
    }
}

/// Thread-safe shared counters handle.
pub type SharedCountersHandle = Arc<SharedCounters>;

/// Create new shared counters.
pub fn shared_counters(n_agents: usize) -> SharedCountersHandle {
    Arc::new(SharedCounters::new(n_agents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_active_and_zeroed() {
        let counters = SharedCounters::new(2);
        assert!(counters.training_active());
        assert_eq!(counters.global_episode(), 0);
        assert_eq!(counters.global_step(), 0);
        assert_eq!(counters.update_step(), 0);
    }

    #[test]
    fn test_flag_toggles() {
        let counters = SharedCounters::new(1);
        counters.set_training_active(false);
        assert!(!counters.training_active());
    }

    #[test]
    fn test_increments_return_new_value() {
        let counters = SharedCounters::new(1);
        assert_eq!(counters.increment_global_episode(), 1);
        assert_eq!(counters.increment_global_episode(), 2);
        assert_eq!(counters.increment_global_step(), 1);
        assert_eq!(counters.increment_update_step(), 1);
    }

    #[test]
    fn test_agent_gauge_roundtrip() {
        let counters = SharedCounters::new(3);
        counters.record_agent_episode(1, 42.0, 1.5, 7);
        let gauge = counters.agent_gauge(1).unwrap();
        assert_eq!(gauge.reward, 42.0);
        assert_eq!(gauge.episode_secs, 1.5);
        assert_eq!(gauge.episode, 7);
        // Other workers untouched.
        assert_eq!(counters.agent_gauge(0).unwrap(), AgentGauge::default());
    }

    #[test]
    fn test_out_of_range_agent_ignored() {
        let counters = SharedCounters::new(1);
        counters.record_agent_episode(5, 1.0, 1.0, 1);
        assert!(counters.agent_gauge(5).is_none());
    }

    #[test]
    fn test_snapshot_is_consistent_view() {
        let counters = SharedCounters::new(2);
        counters.increment_global_episode();
        counters.record_losses(0.5, 1.5, 0.01);
        counters.set_pipeline_gauges(3, 1, 128);
        counters.record_eval_position(-1.0, 2.0);

        let snap = counters.snapshot();
        assert_eq!(snap.global_episode, 1);
        assert_eq!(snap.losses.policy_loss, 0.5);
        assert_eq!(snap.pipeline.buffer_len, 128);
        assert_eq!(snap.eval.x, -1.0);
        assert_eq!(snap.agents.len(), 2);
    }

    #[test]
    fn test_shared_handle() {
        let counters = shared_counters(1);
        let other = Arc::clone(&counters);
        counters.increment_global_step();
        assert_eq!(other.global_step(), 1);
    }
}
