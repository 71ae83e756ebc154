//! Transition types flowing through the experience pipeline.
//!
//! Two levels of granularity:
//! - `Transition`: a single environment step, ephemeral, lives only inside
//!   an actor's N-step window
//! - `NStepTransition`: the N-step-discounted form that actually crosses the
//!   actor → replay boundary and is stored for sampling

use serde::{Deserialize, Serialize};

/// Observation vector produced by an environment.
pub type Observation = Vec<f32>;

/// Continuous action vector consumed by an environment.
pub type ActionVector = Vec<f32>;

/// A single environment step.
///
/// Consumed immediately by the N-step accumulator; never stored or sent
/// across threads on its own.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Observation before the step.
    pub state: Observation,
    /// Action taken.
    pub action: ActionVector,
    /// Reward received.
    pub reward: f64,
}

impl Transition {
    /// Create a new single-step transition.
    pub fn new(state: Observation, action: ActionVector, reward: f64) -> Self {
        Self {
            state,
            action,
            reward,
        }
    }
}

/// An N-step-discounted transition, the unit of replay storage.
///
/// `discounted_reward` folds up to N consecutive rewards:
/// `r_0 + gamma r_1 + ... + gamma^{k-1} r_{k-1}`. `effective_gamma` is
/// `gamma^k` where `k` is the number of rewards actually folded in; a
/// trailing partial window at episode end has `k < N`, and the bootstrap
/// term on the consumer side must use this exponent rather than `gamma^N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NStepTransition {
    /// Observation at the start of the window.
    pub state: Observation,
    /// Action taken at the start of the window.
    pub action: ActionVector,
    /// Discounted sum of the window's rewards.
    pub discounted_reward: f64,
    /// Observation after the newest step in the window.
    pub next_state: Observation,
    /// Whether the episode terminated at the end of the window.
    pub done: bool,
    /// `gamma^k` for the `k` rewards folded into `discounted_reward`.
    pub effective_gamma: f64,
}

impl NStepTransition {
    /// Number of state dimensions.
    pub fn state_dim(&self) -> usize {
        self.state.len()
    }

    /// Number of action dimensions.
    pub fn action_dim(&self) -> usize {
        self.action.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_new() {
        let t = Transition::new(vec![1.0, 2.0], vec![0.5], 1.5);
        assert_eq!(t.state, vec![1.0, 2.0]);
        assert_eq!(t.action, vec![0.5]);
        assert_eq!(t.reward, 1.5);
    }

    #[test]
    fn test_nstep_transition_dims() {
        let t = NStepTransition {
            state: vec![1.0, 2.0, 3.0],
            action: vec![0.1, 0.2],
            discounted_reward: 2.71,
            next_state: vec![4.0, 5.0, 6.0],
            done: false,
            effective_gamma: 0.729,
        };
        assert_eq!(t.state_dim(), 3);
        assert_eq!(t.action_dim(), 2);
    }

    #[test]
    fn test_nstep_transition_serde_roundtrip() {
        let t = NStepTransition {
            state: vec![1.0],
            action: vec![-1.0],
            discounted_reward: 0.5,
            next_state: vec![2.0],
            done: true,
            effective_gamma: 0.9,
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: NStepTransition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.state, t.state);
        assert_eq!(back.done, t.done);
        assert_eq!(back.effective_gamma, t.effective_gamma);
    }
}
