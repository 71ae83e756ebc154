//! Sampler coordinator: the bridge between actors and the learner.
//!
//! A tight polling loop that, each iteration: drains newly produced
//! experience into the replay buffer, applies any pending priority
//! corrections from the learner, samples one training batch, evicts
//! capacity overflow, and publishes occupancy gauges. All queue
//! interactions are non-blocking; a full batch queue drops the batch and
//! the next iteration retries with a fresh sample.
//!
//! On shutdown the coordinator optionally persists the buffer and drains
//! the batch queue so nothing stays pinned after the learner exits.

use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;

use crate::config::TrainingConfig;
use crate::core::counters::SharedCountersHandle;
use crate::core::transition::NStepTransition;
use crate::replay::replay_buffer::{PriorityUpdate, ReplayBuffer, TrainingBatch};
use crate::replay::schedule::BetaSchedule;

/// Shared handles the sampler needs from the orchestrator.
///
/// The batch receiver is only used for the shutdown drain.
pub struct SamplerShared {
    pub counters: SharedCountersHandle,
    pub raw_rx: Receiver<NStepTransition>,
    pub batch_tx: Sender<TrainingBatch>,
    pub batch_rx: Receiver<TrainingBatch>,
    pub priority_rx: Receiver<PriorityUpdate>,
}

/// Handle for a spawned sampler thread.
pub struct SamplerHandle {
    thread: JoinHandle<()>,
}

impl SamplerHandle {
    /// Wait for the sampler thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// Owns the replay buffer and pumps the experience pipeline.
pub struct SamplerCoordinator {
    config: TrainingConfig,
    buffer: ReplayBuffer,
    beta_schedule: BetaSchedule,
}

impl SamplerCoordinator {
    /// Create a coordinator with a fresh replay buffer.
    pub fn new(config: TrainingConfig) -> Self {
        let buffer = ReplayBuffer::new(config.replay_config());
        let beta_schedule = config.beta_schedule();
        Self {
            config,
            buffer,
            beta_schedule,
        }
    }

    /// Create a coordinator around an existing buffer (e.g. restored from
    /// a dump, or seeded for tests).
    pub fn with_buffer(config: TrainingConfig, buffer: ReplayBuffer) -> Self {
        let beta_schedule = config.beta_schedule();
        Self {
            config,
            buffer,
            beta_schedule,
        }
    }

    /// Current replay occupancy.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// One pipeline iteration: drain, correct, sample, evict, gauge.
    pub fn iterate(&mut self, shared: &SamplerShared) {
        // (a) Drain everything currently queued, non-blocking.
        while let Ok(transition) = shared.raw_rx.try_recv() {
            self.buffer.add(transition);
        }

        // (b) Produce one batch if the buffer can cover it.
        if self.buffer.len() >= self.config.batch_size {
            while let Ok(update) = shared.priority_rx.try_recv() {
                self.buffer
                    .update_priorities(&update.indices, &update.priorities);
            }

            let beta = self
                .beta_schedule
                .beta_at(shared.counters.global_episode());
            if let Some(batch) = self.buffer.sample(self.config.batch_size, beta) {
                // Full queue: drop, the next iteration retries.
                let _ = shared.batch_tx.try_send(batch);
            }
        }

        // (c) Evict capacity overflow, oldest first.
        let overflow = self.buffer.len().saturating_sub(self.config.replay_capacity);
        if overflow > 0 {
            self.buffer.remove(overflow);
        }

        // (d) Publish occupancy gauges.
        shared.counters.set_pipeline_gauges(
            shared.raw_rx.len(),
            shared.batch_tx.len(),
            self.buffer.len(),
        );
    }

    /// Run until the training flag clears, then perform shutdown duties.
    pub fn run(mut self, shared: SamplerShared) {
        while shared.counters.training_active() {
            std::thread::sleep(self.config.sampler_poll_interval());
            self.iterate(&shared);
        }
        self.shutdown(&shared);
    }

    /// Spawn the coordinator on a named thread.
    pub fn spawn(self, shared: SamplerShared) -> SamplerHandle {
        let thread = std::thread::Builder::new()
            .name("Sampler".to_string())
            .spawn(move || self.run(shared))
            .expect("failed to spawn sampler thread");
        SamplerHandle { thread }
    }

    fn shutdown(&mut self, shared: &SamplerShared) {
        if self.config.save_buffer {
            let path = self
                .config
                .checkpoint_dir
                .join(self.config.experiment_signature())
                .join("replay_buffer.json");
            match self.buffer.dump(&path) {
                Ok(written) => println!("replay buffer persisted: {} entries", written),
                Err(e) => eprintln!("replay buffer dump failed: {}", e),
            }
        }

        // Unpin whatever the learner left unread.
        while shared.batch_rx.try_recv().is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::shared_counters;
    use crate::policy::Algorithm;

    fn transition(tag: f64) -> NStepTransition {
        NStepTransition {
            state: vec![tag as f32],
            action: vec![0.0],
            discounted_reward: tag,
            next_state: vec![tag as f32 + 1.0],
            done: false,
            effective_gamma: 0.9,
        }
    }

    fn fixture(batch_size: usize, capacity: usize) -> (SamplerCoordinator, SamplerShared, Senders) {
        let config = TrainingConfig::new(Algorithm::D4pg)
            .with_replay(batch_size, capacity)
            .with_num_episodes(100);
        let (raw_tx, raw_rx) = crossbeam_channel::bounded(64);
        let (batch_tx, batch_rx) = crossbeam_channel::bounded(4);
        let (priority_tx, priority_rx) = crossbeam_channel::bounded(64);
        let shared = SamplerShared {
            counters: shared_counters(1),
            raw_rx,
            batch_tx,
            batch_rx,
            priority_rx,
        };
        (
            SamplerCoordinator::new(config),
            shared,
            Senders {
                raw_tx,
                priority_tx,
            },
        )
    }

    struct Senders {
        raw_tx: Sender<NStepTransition>,
        priority_tx: Sender<PriorityUpdate>,
    }

    #[test]
    fn test_single_iteration_moves_batch_through() {
        // Inject exactly batch_size transitions, run one iteration:
        // buffer holds them all and exactly one batch appears.
        let (mut sampler, shared, senders) = fixture(8, 100);
        for i in 0..8 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }

        sampler.iterate(&shared);

        assert_eq!(sampler.buffer_len(), 8);
        assert_eq!(shared.batch_rx.len(), 1);
        let batch = shared.batch_rx.try_recv().unwrap();
        assert_eq!(batch.len(), 8);
    }

    #[test]
    fn test_underfull_buffer_produces_no_batch() {
        let (mut sampler, shared, senders) = fixture(8, 100);
        for i in 0..5 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }
        sampler.iterate(&shared);
        assert_eq!(sampler.buffer_len(), 5);
        assert!(shared.batch_rx.is_empty());
    }

    #[test]
    fn test_overflow_evicted_after_iteration() {
        let (mut sampler, shared, senders) = fixture(4, 16);
        for i in 0..40 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }
        sampler.iterate(&shared);
        assert_eq!(sampler.buffer_len(), 16);
    }

    #[test]
    fn test_priority_updates_applied_before_sampling() {
        let (mut sampler, shared, senders) = fixture(4, 100);
        for i in 0..4 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }
        senders
            .priority_tx
            .send(PriorityUpdate {
                indices: vec![0, 99],
                priorities: vec![9.0, 9.0],
            })
            .unwrap();

        sampler.iterate(&shared);

        // In-range index updated, stale index ignored.
        assert!(sampler.buffer.get(0).unwrap().priority > 8.0);
        assert_eq!(sampler.buffer.get(1).unwrap().priority, 1.0);
    }

    #[test]
    fn test_gauges_published() {
        let (mut sampler, shared, senders) = fixture(4, 100);
        for i in 0..6 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }
        sampler.iterate(&shared);
        let snap = shared.counters.snapshot();
        assert_eq!(snap.pipeline.buffer_len, 6);
        assert_eq!(snap.pipeline.raw_queue_depth, 0);
        assert_eq!(snap.pipeline.batch_queue_depth, 1);
    }

    #[test]
    fn test_full_batch_queue_drops_batch() {
        let (mut sampler, shared, senders) = fixture(2, 100);
        for i in 0..4 {
            senders.raw_tx.send(transition(i as f64)).unwrap();
        }
        // Batch queue capacity is 4; five iterations must not block.
        for _ in 0..5 {
            sampler.iterate(&shared);
        }
        assert_eq!(shared.batch_rx.len(), 4);
    }

    #[test]
    fn test_run_exits_when_flag_cleared_with_closed_queues() {
        // Liveness: producers gone, flag cleared — run() must return.
        let (sampler, shared, senders) = fixture(4, 100);
        shared.counters.set_training_active(false);
        drop(senders);
        sampler.run(shared);
    }
}
