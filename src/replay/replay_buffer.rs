//! Bounded experience replay with optional proportional prioritization.
//!
//! Storage is a FIFO ring of N-step transitions. Sampling is either
//! uniform or proportional to `priority^alpha`, with importance-sampling
//! weights `(N * P(i))^-beta` normalized so the largest weight in a batch
//! is 1.0. New entries always receive the maximum priority observed so
//! far, so every transition is eligible for selection before any gradient
//! has been computed on it.
//!
//! The buffer is owned by the sampler coordinator; it is not shared across
//! threads. Capacity enforcement is the caller's job (`remove` evicts the
//! oldest entries), which lets one pipeline iteration insert, sample and
//! then trim without the buffer second-guessing the order.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use crate::core::transition::NStepTransition;

/// A stored transition with its sampling priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub transition: NStepTransition,
    pub priority: f64,
}

/// One sampled training batch.
///
/// `indices` and `weights` ride along for the priority-update round trip;
/// under uniform sampling every weight is 1.0.
#[derive(Debug, Clone)]
pub struct TrainingBatch {
    pub transitions: Vec<NStepTransition>,
    pub indices: Vec<usize>,
    pub weights: Vec<f64>,
}

impl TrainingBatch {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Priority correction sent from the learner back to the buffer.
#[derive(Debug, Clone)]
pub struct PriorityUpdate {
    pub indices: Vec<usize>,
    pub priorities: Vec<f64>,
}

/// Replay buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayBufferConfig {
    /// Maximum number of transitions to retain.
    pub capacity: usize,
    /// Whether sampling is priority-weighted.
    pub prioritized: bool,
    /// Priority exponent; 0 degenerates to uniform sampling.
    pub alpha: f64,
    /// Small constant keeping updated priorities strictly positive.
    pub epsilon: f64,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            prioritized: true,
            alpha: 0.6,
            epsilon: 1e-6,
        }
    }
}

impl ReplayBufferConfig {
    /// Create a config with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    /// Set whether sampling is prioritized.
    pub fn with_prioritized(mut self, prioritized: bool) -> Self {
        self.prioritized = prioritized;
        self
    }

    /// Set the priority exponent.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Error type for replay persistence.
#[derive(Debug)]
pub enum ReplayError {
    /// IO error during dump/load.
    Io(io::Error),
    /// Serialization error.
    Serde(serde_json::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Io(e) => write!(f, "IO error: {}", e),
            ReplayError::Serde(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        ReplayError::Io(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        ReplayError::Serde(e)
    }
}

/// Bounded FIFO replay store with uniform or prioritized sampling.
pub struct ReplayBuffer {
    entries: VecDeque<ReplayEntry>,
    config: ReplayBufferConfig,
    /// Maximum priority observed so far; assigned to new entries.
    max_priority: f64,
    rng: fastrand::Rng,
}

impl ReplayBuffer {
    /// Create an empty buffer.
    pub fn new(config: ReplayBufferConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            config,
            max_priority: 1.0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Create an empty buffer with a deterministic sampling stream.
    pub fn with_seed(config: ReplayBufferConfig, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new(config)
        }
    }

    /// Restore a buffer from a previous `dump`.
    pub fn load(config: ReplayBufferConfig, path: &Path) -> Result<Self, ReplayError> {
        let reader = BufReader::new(File::open(path)?);
        let entries: Vec<ReplayEntry> = serde_json::from_reader(reader)?;
        let max_priority = entries
            .iter()
            .map(|e| e.priority)
            .fold(1.0f64, f64::max);
        Ok(Self {
            entries: entries.into(),
            config,
            max_priority,
            rng: fastrand::Rng::new(),
        })
    }

    /// Append a transition with the maximum priority observed so far.
    pub fn add(&mut self, transition: NStepTransition) {
        self.entries.push_back(ReplayEntry {
            transition,
            priority: self.max_priority,
        });
    }

    /// Sample a batch, or `None` if occupancy is below `batch_size`.
    ///
    /// Uniform mode draws indices i.i.d. over current contents. Prioritized
    /// mode draws with probability proportional to `priority^alpha` and
    /// attaches bias-correction weights `(N * P(i))^-beta`, normalized so
    /// the largest weight in the batch is 1.0. With `alpha = 0`, or when
    /// all priorities are equal, the selection distribution is uniform.
    pub fn sample(&mut self, batch_size: usize, beta: f64) -> Option<TrainingBatch> {
        let n = self.entries.len();
        if batch_size == 0 || n < batch_size {
            return None;
        }

        let (indices, weights) = if self.config.prioritized {
            self.draw_prioritized(batch_size, beta)
        } else {
            (self.draw_uniform(batch_size), vec![1.0; batch_size])
        };

        let transitions = indices
            .iter()
            .map(|&i| self.entries[i].transition.clone())
            .collect();

        Some(TrainingBatch {
            transitions,
            indices,
            weights,
        })
    }

    /// Overwrite priorities for the referenced entries.
    ///
    /// Priorities pass through `|p| + epsilon` so they stay strictly
    /// positive. Indices that no longer resolve (entry already evicted)
    /// are ignored; no other entry is affected.
    pub fn update_priorities(&mut self, indices: &[usize], priorities: &[f64]) {
        for (&idx, &p) in indices.iter().zip(priorities.iter()) {
            if let Some(entry) = self.entries.get_mut(idx) {
                let adjusted = p.abs() + self.config.epsilon;
                entry.priority = adjusted;
                self.max_priority = self.max_priority.max(adjusted);
            }
        }
    }

    /// Evict the `count` oldest entries (FIFO).
    pub fn remove(&mut self, count: usize) {
        let count = count.min(self.entries.len());
        self.entries.drain(..count);
    }

    /// Current occupancy.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity; enforcement happens via `remove`.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Entry at `idx`, if present.
    pub fn get(&self, idx: usize) -> Option<&ReplayEntry> {
        self.entries.get(idx)
    }

    /// Serialize current contents for later resumption.
    ///
    /// Returns the number of entries written. The parent directory is
    /// created if missing.
    pub fn dump(&self, path: &Path) -> Result<usize, ReplayError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        let entries: Vec<&ReplayEntry> = self.entries.iter().collect();
        serde_json::to_writer(writer, &entries)?;
        Ok(entries.len())
    }

    fn draw_uniform(&mut self, batch_size: usize) -> Vec<usize> {
        let n = self.entries.len();
        (0..batch_size).map(|_| self.rng.usize(0..n)).collect()
    }

    fn draw_prioritized(&mut self, batch_size: usize, beta: f64) -> (Vec<usize>, Vec<f64>) {
        let n = self.entries.len();

        // Prefix sums of priority^alpha; each draw is a binary search.
        let mut cumulative = Vec::with_capacity(n);
        let mut total = 0.0f64;
        for entry in &self.entries {
            total += entry.priority.powf(self.config.alpha);
            cumulative.push(total);
        }

        if !(total > 0.0) || !total.is_finite() {
            // Degenerate priority mass; fall back to uniform.
            let indices = self.draw_uniform(batch_size);
            return (indices, vec![1.0; batch_size]);
        }

        let mut indices = Vec::with_capacity(batch_size);
        let mut weights = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let u = self.rng.f64() * total;
            let idx = cumulative.partition_point(|&c| c <= u).min(n - 1);
            indices.push(idx);

            let mass = if idx == 0 {
                cumulative[0]
            } else {
                cumulative[idx] - cumulative[idx - 1]
            };
            let prob = mass / total;
            weights.push((n as f64 * prob).powf(-beta));
        }

        // Normalize so the largest weight in the batch is 1.0.
        let max_weight = weights.iter().cloned().fold(0.0f64, f64::max);
        if max_weight > 0.0 {
            for w in &mut weights {
                *w /= max_weight;
            }
        }

        (indices, weights)
    }
}
