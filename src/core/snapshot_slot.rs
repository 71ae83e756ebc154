//! Single-slot policy weight distribution from Learner to Actors.
//!
//! The learner publishes parameter snapshots; exploration actors observe
//! the newest one opportunistically. Swap semantics keep memory bounded:
//! a publish overwrites any snapshot nobody has looked at yet, so at most
//! one pending snapshot exists at any time and stale weights never
//! accumulate.
//!
//! Actors read through `peek_versioned` rather than a consuming take, so
//! every actor sees the latest snapshot regardless of how many workers
//! poll the slot, and skips re-applying a version it has already copied.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// One consistent version of a policy's trainable parameters.
///
/// An ordered sequence of flattened tensors, in the order the policy's
/// `parameters()` accessor yields them. Consumers copy tensor-by-tensor
/// into their own policy; the snapshot itself is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySnapshot {
    tensors: Vec<Vec<f32>>,
}

impl PolicySnapshot {
    /// Wrap an ordered parameter sequence.
    pub fn new(tensors: Vec<Vec<f32>>) -> Self {
        Self { tensors }
    }

    /// The ordered parameter tensors.
    pub fn tensors(&self) -> &[Vec<f32>] {
        &self.tensors
    }

    /// Number of tensors.
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Total number of scalar parameters across all tensors.
    pub fn parameter_count(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }
}

/// Single-slot snapshot container for learner → actor weight transfer.
pub struct SnapshotSlot {
    pending: Mutex<Option<PolicySnapshot>>,
    /// Version of the snapshot currently in the slot.
    version: AtomicU64,
    /// Total snapshots published.
    published_count: AtomicUsize,
    /// Snapshots overwritten before any actor observed them.
    dropped_count: AtomicUsize,
}

impl SnapshotSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
            version: AtomicU64::new(0),
            published_count: AtomicUsize::new(0),
            dropped_count: AtomicUsize::new(0),
        }
    }

    /// Publish a snapshot, overwriting any pending one.
    ///
    /// Called by the learner. Returns true if an unobserved snapshot was
    /// dropped by the overwrite.
    pub fn publish(&self, snapshot: PolicySnapshot) -> bool {
        let mut guard = self.pending.lock();
        let was_pending = guard.is_some();
        if was_pending {
            self.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
        *guard = Some(snapshot);
        self.version.fetch_add(1, Ordering::Release);
        self.published_count.fetch_add(1, Ordering::Relaxed);
        was_pending
    }

    /// Clone the current snapshot with its version, without consuming it.
    ///
    /// Returns `None` if nothing has been published yet. Actors compare the
    /// version against the last one they applied to avoid redundant copies.
    pub fn peek_versioned(&self) -> Option<(PolicySnapshot, u64)> {
        let guard = self.pending.lock();
        guard
            .clone()
            .map(|s| (s, self.version.load(Ordering::Acquire)))
    }

    /// Take the current snapshot, leaving the slot empty.
    pub fn take(&self) -> Option<PolicySnapshot> {
        self.pending.lock().take()
    }

    /// Check whether a snapshot is available.
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Version of the most recently published snapshot (0 = none yet).
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Publication statistics: (published, dropped).
    pub fn stats(&self) -> (usize, usize) {
        (
            self.published_count.load(Ordering::Relaxed),
            self.dropped_count.load(Ordering::Relaxed),
        )
    }
}

impl Default for SnapshotSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe shared snapshot slot.
pub type SharedSnapshotSlot = Arc<SnapshotSlot>;

/// Create a new shared snapshot slot.
pub fn snapshot_slot() -> SharedSnapshotSlot {
    Arc::new(SnapshotSlot::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(v: f32) -> PolicySnapshot {
        PolicySnapshot::new(vec![vec![v, v], vec![v]])
    }

    #[test]
    fn test_empty_slot() {
        let slot = SnapshotSlot::new();
        assert!(slot.peek_versioned().is_none());
        assert!(!slot.has_pending());
        assert_eq!(slot.version(), 0);
    }

    #[test]
    fn test_publish_and_peek() {
        let slot = SnapshotSlot::new();
        slot.publish(snap(1.0));
        assert_eq!(slot.version(), 1);

        let (s, v) = slot.peek_versioned().unwrap();
        assert_eq!(s, snap(1.0));
        assert_eq!(v, 1);

        // Peek does not consume.
        assert!(slot.peek_versioned().is_some());
        assert!(slot.has_pending());
    }

    #[test]
    fn test_publish_overwrites_pending() {
        let slot = SnapshotSlot::new();
        assert!(!slot.publish(snap(1.0)));
        assert!(slot.publish(snap(2.0)));
        assert!(slot.publish(snap(3.0)));

        let (s, v) = slot.peek_versioned().unwrap();
        assert_eq!(s, snap(3.0));
        assert_eq!(v, 3);

        let (published, dropped) = slot.stats();
        assert_eq!(published, 3);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_take_empties_slot() {
        let slot = SnapshotSlot::new();
        slot.publish(snap(1.0));
        assert_eq!(slot.take(), Some(snap(1.0)));
        assert!(slot.take().is_none());
        // Version is retained even after the slot empties.
        assert_eq!(slot.version(), 1);
    }

    #[test]
    fn test_parameter_count() {
        let s = PolicySnapshot::new(vec![vec![0.0; 6], vec![0.0; 2]]);
        assert_eq!(s.tensor_count(), 2);
        assert_eq!(s.parameter_count(), 8);
    }

    #[test]
    fn test_shared_slot() {
        let slot = snapshot_slot();
        let reader = Arc::clone(&slot);
        slot.publish(snap(4.0));
        assert_eq!(reader.peek_versioned().unwrap().1, 1);
    }
}
