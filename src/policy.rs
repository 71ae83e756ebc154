//! Policy seams and algorithm selection.
//!
//! The pipeline is agnostic to how actions are computed or how gradients
//! flow; it only needs a small capability surface. Actors use `Policy`
//! (inference + parameter copy + checkpoint blob); the learner additionally
//! needs `TrainablePolicy` (one optimization step per batch).
//!
//! Concrete algorithms plug in behind these traits. The pipeline itself
//! only branches on the `Algorithm` tag, decided once at startup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::transition::ActionVector;
use crate::replay::replay_buffer::TrainingBatch;

/// Supported training algorithms.
///
/// Decided once at startup; the pipeline consults the tag only for
/// behavior that genuinely differs per family (action noise, checkpoint
/// labels). Everything else flows through the policy traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    Ddpg,
    D4pg,
    Sac,
    Dsac,
}

impl Algorithm {
    /// All supported algorithms.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Ddpg,
        Algorithm::D4pg,
        Algorithm::Sac,
        Algorithm::Dsac,
    ];

    /// Canonical identifier, used in checkpoint and dump names.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Ddpg => "DDPG",
            Algorithm::D4pg => "D4PG",
            Algorithm::Sac => "SAC",
            Algorithm::Dsac => "DSAC",
        }
    }

    /// Whether exploration applies Ornstein–Uhlenbeck action noise.
    ///
    /// Deterministic-policy families explore through additive noise; the
    /// soft-actor families sample their own stochastic actions instead.
    pub fn uses_action_noise(&self) -> bool {
        matches!(self, Algorithm::Ddpg | Algorithm::D4pg)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for an unrecognized algorithm identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown algorithm '{}', expected one of DDPG, D4PG, SAC, DSAC",
            self.0
        )
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DDPG" => Ok(Algorithm::Ddpg),
            "D4PG" => Ok(Algorithm::D4pg),
            "SAC" => Ok(Algorithm::Sac),
            "DSAC" => Ok(Algorithm::Dsac),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Error from policy state deserialization.
#[derive(Debug)]
pub enum PolicyError {
    /// Checkpoint blob did not match the policy's expected layout.
    MalformedState(String),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::MalformedState(msg) => write!(f, "malformed policy state: {}", msg),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Inference-side policy capability.
///
/// Each actor owns an independent instance; the learner holds the sole
/// trainable copy. Parameter application is an in-place tensor-by-tensor
/// copy, never a replacement of the policy object, so references held by
/// an actor mid-episode stay valid.
pub trait Policy: Send {
    /// Compute an action for an observation.
    ///
    /// `deterministic` selects the greedy/mean action; otherwise stochastic
    /// policies sample. Deterministic-policy algorithms may ignore the flag.
    fn forward(&self, observation: &[f32], deterministic: bool) -> ActionVector;

    /// The trainable parameters as an ordered sequence of flattened tensors.
    fn parameters(&self) -> Vec<Vec<f32>>;

    /// Copy a parameter snapshot into this policy, tensor by tensor.
    ///
    /// Tensors beyond the policy's own count, or longer than the matching
    /// tensor, are truncated; the policy object itself is never replaced.
    fn apply_parameters(&mut self, tensors: &[Vec<f32>]);

    /// Serialize full state to an opaque checkpoint blob.
    fn state_bytes(&self) -> Vec<u8>;

    /// Restore state from a checkpoint blob.
    fn load_state_bytes(&mut self, bytes: &[u8]) -> Result<(), PolicyError>;
}

/// Result of one optimization step.
#[derive(Debug, Clone, Default)]
pub struct LearnReport {
    /// Policy (actor) loss.
    pub policy_loss: f64,
    /// Value (critic) loss.
    pub value_loss: f64,
    /// Per-sample training errors, aligned with the batch order.
    ///
    /// Used as updated replay priorities when prioritization is enabled;
    /// leave empty to skip the priority round trip.
    pub sample_errors: Vec<f64>,
}

/// Learner-side policy capability: one optimization step per batch.
pub trait TrainablePolicy: Policy {
    /// Perform one gradient update on a sampled batch.
    fn learn_on_batch(&mut self, batch: &TrainingBatch) -> LearnReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("D4PG".parse::<Algorithm>().unwrap(), Algorithm::D4pg);
        assert_eq!("sac".parse::<Algorithm>().unwrap(), Algorithm::Sac);
        assert_eq!("Ddpg".parse::<Algorithm>().unwrap(), Algorithm::Ddpg);
    }

    #[test]
    fn test_algorithm_parse_unknown_fails_fast() {
        let err = "TD3".parse::<Algorithm>().unwrap_err();
        assert_eq!(err, UnknownAlgorithm("TD3".to_string()));
        assert!(err.to_string().contains("TD3"));
    }

    #[test]
    fn test_action_noise_per_family() {
        assert!(Algorithm::Ddpg.uses_action_noise());
        assert!(Algorithm::D4pg.uses_action_noise());
        assert!(!Algorithm::Sac.uses_action_noise());
        assert!(!Algorithm::Dsac.uses_action_noise());
    }

    #[test]
    fn test_labels_roundtrip() {
        for algo in Algorithm::ALL {
            assert_eq!(algo.label().parse::<Algorithm>().unwrap(), algo);
        }
    }
}
