//! N-step return accumulation for actor-local experience.
//!
//! Converts a stream of single-step transitions into N-step-discounted
//! transitions. Each actor owns one accumulator; it is reset at every
//! episode start and drained through a single flush path at episode end,
//! whether the episode terminated naturally or hit the step ceiling.
//!
//! Every pushed transition contributes exactly one emitted N-step
//! transition: either when the window fills (full `gamma^N` horizon) or
//! during the flush (progressively shorter horizons).

use std::collections::VecDeque;

use crate::core::transition::{NStepTransition, Transition};

/// Per-actor FIFO window that builds N-step returns.
#[derive(Debug)]
pub struct NStepAccumulator {
    window: VecDeque<Transition>,
    n: usize,
    gamma: f64,
}

impl NStepAccumulator {
    /// Create an accumulator for `n`-step returns with discount `gamma`.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if `n == 0` or `gamma` is outside `(0, 1]`.
    pub fn new(n: usize, gamma: f64) -> Self {
        debug_assert!(n >= 1, "NStepAccumulator: n must be >= 1, got {}", n);
        debug_assert!(
            gamma > 0.0 && gamma <= 1.0,
            "NStepAccumulator: gamma must be in (0, 1], got {}",
            gamma
        );
        Self {
            window: VecDeque::with_capacity(n),
            n,
            gamma,
        }
    }

    /// Append one step; emits an N-step transition once the window is full.
    ///
    /// `next_state` and `done` describe the environment after the step just
    /// taken, and are attached to the emitted transition (whose window ends
    /// at this step).
    pub fn push(
        &mut self,
        transition: Transition,
        next_state: &[f32],
        done: bool,
    ) -> Option<NStepTransition> {
        self.window.push_back(transition);
        if self.window.len() >= self.n {
            self.emit_front(next_state, done)
        } else {
            None
        }
    }

    /// Drain the remaining window, oldest first.
    ///
    /// Called exactly once per episode, after the step loop exits. Each
    /// drained entry folds the rewards still ahead of it, so the horizons
    /// shrink from `window length` down to one and `effective_gamma`
    /// shrinks accordingly. All emitted transitions carry the terminal
    /// observation and the episode's final `done` flag (false when the
    /// episode was cut by the step ceiling rather than the environment).
    pub fn flush(&mut self, terminal_state: &[f32], done: bool) -> Vec<NStepTransition> {
        let mut drained = Vec::with_capacity(self.window.len());
        while !self.window.is_empty() {
            if let Some(t) = self.emit_front(terminal_state, done) {
                drained.push(t);
            }
        }
        drained
    }

    /// Clear the window at episode start; no carry-over across episodes.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    /// Number of steps currently buffered.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Pop the oldest entry and fold the rest of the window into it.
    fn emit_front(&mut self, next_state: &[f32], done: bool) -> Option<NStepTransition> {
        let head = self.window.pop_front()?;
        let mut discounted_reward = head.reward;
        let mut effective_gamma = self.gamma;
        for later in &self.window {
            discounted_reward += later.reward * effective_gamma;
            effective_gamma *= self.gamma;
        }
        Some(NStepTransition {
            state: head.state,
            action: head.action,
            discounted_reward,
            next_state: next_state.to_vec(),
            done,
            effective_gamma,
        })
    }
}
