//! Learner: consumes training batches, publishes policy snapshots.
//!
//! The gradient math lives behind the `TrainablePolicy` seam; this shell
//! owns the loop discipline: blocking-with-timeout batch pulls so the
//! shutdown flag is rechecked even when the pipeline stalls, loss and
//! update-step accounting, snapshot publication on a configured cadence
//! (latest-wins, non-blocking), and the priority-correction round trip
//! back to the replay buffer.
//!
//! The learner is also the component that ends a training run: once the
//! global episode ceiling is observed in the shared counters, it clears
//! the training flag and every other loop winds down within one iteration.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::config::TrainingConfig;
use crate::core::counters::SharedCountersHandle;
use crate::core::snapshot_slot::{PolicySnapshot, SharedSnapshotSlot};
use crate::policy::TrainablePolicy;
use crate::replay::replay_buffer::{PriorityUpdate, TrainingBatch};

/// Shared handles the learner needs from the orchestrator.
pub struct LearnerShared {
    pub counters: SharedCountersHandle,
    pub batch_rx: Receiver<TrainingBatch>,
    pub priority_tx: Sender<PriorityUpdate>,
    pub snapshot_slot: SharedSnapshotSlot,
}

/// Handle for a spawned learner thread.
pub struct LearnerHandle {
    thread: JoinHandle<()>,
}

impl LearnerHandle {
    /// Wait for the learner thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// Optimization loop shell around a trainable policy.
pub struct Learner<P: TrainablePolicy> {
    config: TrainingConfig,
    policy: P,
}

impl<P: TrainablePolicy> Learner<P> {
    /// Create a learner owning the sole trainable policy copy.
    pub fn new(config: TrainingConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Run until the flag clears or the episode ceiling is reached.
    /// Returns the trained policy.
    pub fn run(mut self, shared: LearnerShared) -> P {
        loop {
            if !shared.counters.training_active() {
                break;
            }
            if shared.counters.global_episode() >= self.config.num_episodes {
                // Ceiling reached: this is the shutdown signal for the
                // whole pipeline.
                shared.counters.set_training_active(false);
                break;
            }

            match shared.batch_rx.recv_timeout(self.config.learner_poll_interval()) {
                Ok(batch) => self.train_on(batch, &shared),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.policy
    }

    /// Spawn the learner on a named thread.
    pub fn spawn(self, shared: LearnerShared) -> LearnerHandle
    where
        P: 'static,
    {
        let thread = std::thread::Builder::new()
            .name("Learner".to_string())
            .spawn(move || {
                self.run(shared);
            })
            .expect("failed to spawn learner thread");
        LearnerHandle { thread }
    }

    fn train_on(&mut self, batch: TrainingBatch, shared: &LearnerShared) {
        let started = Instant::now();
        let report = self.policy.learn_on_batch(&batch);
        let update_secs = started.elapsed().as_secs_f64();

        let update_step = shared.counters.increment_update_step();
        shared
            .counters
            .record_losses(report.policy_loss, report.value_loss, update_secs);

        // Send corrected priorities back; a full queue defers the
        // correction, which the buffer tolerates as staleness.
        if self.config.prioritized && !report.sample_errors.is_empty() {
            let _ = shared.priority_tx.try_send(PriorityUpdate {
                indices: batch.indices.clone(),
                priorities: report.sample_errors,
            });
        }

        if update_step % self.config.publish_interval == 0 {
            shared
                .snapshot_slot
                .publish(PolicySnapshot::new(self.policy.parameters()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::shared_counters;
    use crate::core::snapshot_slot::snapshot_slot;
    use crate::core::transition::{ActionVector, NStepTransition};
    use crate::policy::{Algorithm, LearnReport, Policy, PolicyError};

    /// Policy that counts updates and reports batch-aligned errors.
    struct CountingPolicy {
        updates: usize,
    }

    impl Policy for CountingPolicy {
        fn forward(&self, _observation: &[f32], _deterministic: bool) -> ActionVector {
            vec![0.0]
        }

        fn parameters(&self) -> Vec<Vec<f32>> {
            vec![vec![self.updates as f32]]
        }

        fn apply_parameters(&mut self, _tensors: &[Vec<f32>]) {}

        fn state_bytes(&self) -> Vec<u8> {
            Vec::new()
        }

        fn load_state_bytes(&mut self, _bytes: &[u8]) -> Result<(), PolicyError> {
            Ok(())
        }
    }

    impl TrainablePolicy for CountingPolicy {
        fn learn_on_batch(&mut self, batch: &TrainingBatch) -> LearnReport {
            self.updates += 1;
            LearnReport {
                policy_loss: 0.25,
                value_loss: 0.5,
                sample_errors: batch.transitions.iter().map(|_| 2.0).collect(),
            }
        }
    }

    fn batch(size: usize) -> TrainingBatch {
        let transitions = (0..size)
            .map(|i| NStepTransition {
                state: vec![i as f32],
                action: vec![0.0],
                discounted_reward: 1.0,
                next_state: vec![i as f32 + 1.0],
                done: false,
                effective_gamma: 0.9,
            })
            .collect();
        TrainingBatch {
            transitions,
            indices: (0..size).collect(),
            weights: vec![1.0; size],
        }
    }

    struct Fixture {
        shared: LearnerShared,
        batch_tx: Sender<TrainingBatch>,
        priority_rx: Receiver<PriorityUpdate>,
    }

    fn fixture(config: &TrainingConfig) -> Fixture {
        let (batch_tx, batch_rx) = crossbeam_channel::bounded(8);
        let (priority_tx, priority_rx) = crossbeam_channel::bounded(8);
        let shared = LearnerShared {
            counters: shared_counters(config.n_agents),
            batch_rx,
            priority_tx,
            snapshot_slot: snapshot_slot(),
        };
        Fixture {
            shared,
            batch_tx,
            priority_rx,
        }
    }

    fn quick_config() -> TrainingConfig {
        let mut config = TrainingConfig::new(Algorithm::D4pg).with_replay(4, 100);
        config.learner_poll_ms = 5;
        config.publish_interval = 2;
        config
    }

    #[test]
    fn test_consumes_buffered_batches_then_exits_on_disconnect() {
        let config = quick_config();
        let f = fixture(&config);
        f.batch_tx.send(batch(4)).unwrap();
        f.batch_tx.send(batch(4)).unwrap();
        drop(f.batch_tx); // Disconnect ends the run after both batches.

        let counters = f.shared.counters.clone();
        let policy = Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);
        assert_eq!(policy.updates, 2);
        assert_eq!(counters.update_step(), 2);
    }

    #[test]
    fn test_update_steps_and_snapshot_cadence() {
        let config = quick_config();
        let f = fixture(&config);
        for _ in 0..5 {
            f.batch_tx.send(batch(4)).unwrap();
        }
        drop(f.batch_tx);

        let counters = f.shared.counters.clone();
        let slot = f.shared.snapshot_slot.clone();
        Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);

        assert_eq!(counters.update_step(), 5);
        let snap = counters.snapshot();
        assert_eq!(snap.losses.policy_loss, 0.25);
        assert_eq!(snap.losses.value_loss, 0.5);

        // publish_interval = 2 → published at update 2 and 4.
        let (published, _) = slot.stats();
        assert_eq!(published, 2);
        // Latest snapshot carries the freshest parameters.
        let (snapshot, _) = slot.peek_versioned().unwrap();
        assert_eq!(snapshot.tensors(), &[vec![4.0]]);
    }

    #[test]
    fn test_priority_feedback_round_trip() {
        let config = quick_config();
        let f = fixture(&config);
        f.batch_tx.send(batch(4)).unwrap();
        drop(f.batch_tx);

        Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);

        let update = f.priority_rx.try_recv().unwrap();
        assert_eq!(update.indices, vec![0, 1, 2, 3]);
        assert_eq!(update.priorities, vec![2.0; 4]);
    }

    #[test]
    fn test_no_priority_feedback_when_uniform() {
        let config = quick_config().with_prioritized(false);
        let f = fixture(&config);
        f.batch_tx.send(batch(4)).unwrap();
        drop(f.batch_tx);

        Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);
        assert!(f.priority_rx.is_empty());
    }

    #[test]
    fn test_episode_ceiling_clears_flag() {
        let mut config = quick_config();
        config.num_episodes = 3;
        let f = fixture(&config);
        for _ in 0..3 {
            f.shared.counters.increment_global_episode();
        }

        let counters = f.shared.counters.clone();
        Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);
        assert!(!counters.training_active());
    }

    #[test]
    fn test_cleared_flag_exits_without_training() {
        let config = quick_config();
        let f = fixture(&config);
        f.shared.counters.set_training_active(false);
        f.batch_tx.send(batch(4)).unwrap();

        let counters = f.shared.counters.clone();
        Learner::new(config, CountingPolicy { updates: 0 }).run(f.shared);
        assert_eq!(counters.update_step(), 0);
    }
}
