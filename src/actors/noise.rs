//! Ornstein–Uhlenbeck action noise for exploration actors.
//!
//! Temporally correlated noise suits continuous control better than white
//! noise: consecutive perturbations push in a consistent direction, so the
//! agent actually travels somewhere instead of jittering in place. The
//! process is reseeded at every episode start.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::transition::ActionVector;

/// Ornstein–Uhlenbeck process parameters.
#[derive(Debug, Clone)]
pub struct OuNoiseConfig {
    /// Long-run mean of the process.
    pub mu: f64,
    /// Mean-reversion rate.
    pub theta: f64,
    /// Initial noise scale.
    pub max_sigma: f64,
    /// Final noise scale after decay.
    pub min_sigma: f64,
    /// Steps over which sigma decays from max to min.
    pub decay_period: usize,
    /// Lower action bound for clipping.
    pub low: f64,
    /// Upper action bound for clipping.
    pub high: f64,
}

impl Default for OuNoiseConfig {
    fn default() -> Self {
        Self {
            mu: 0.0,
            theta: 0.15,
            max_sigma: 0.3,
            min_sigma: 0.3,
            decay_period: 100_000,
            low: -1.0,
            high: 1.0,
        }
    }
}

impl OuNoiseConfig {
    /// Set the sigma decay range.
    pub fn with_sigma(mut self, max_sigma: f64, min_sigma: f64) -> Self {
        self.max_sigma = max_sigma;
        self.min_sigma = min_sigma;
        self
    }

    /// Set the action clipping bounds.
    pub fn with_bounds(mut self, low: f64, high: f64) -> Self {
        self.low = low;
        self.high = high;
        self
    }
}

/// Stateful Ornstein–Uhlenbeck noise generator for one actor.
#[derive(Debug)]
pub struct OuNoise {
    config: OuNoiseConfig,
    state: Vec<f64>,
    rng: SmallRng,
}

impl OuNoise {
    /// Create a generator for `action_dim`-dimensional actions.
    pub fn new(action_dim: usize, config: OuNoiseConfig) -> Self {
        let state = vec![config.mu; action_dim];
        Self {
            config,
            state,
            rng: SmallRng::seed_from_u64(0),
        }
    }

    /// Reset the process state to the mean and reseed the stream.
    ///
    /// Called at every episode start so episodes explore independently.
    pub fn reset(&mut self, seed: u64) {
        for x in &mut self.state {
            *x = self.config.mu;
        }
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Perturb an action with the current noise state, clipped to bounds.
    ///
    /// `step` is the index within the episode, driving the sigma decay.
    pub fn apply(&mut self, action: &[f32], step: usize) -> ActionVector {
        let sigma = self.sigma_at(step);
        self.evolve(sigma);
        action
            .iter()
            .zip(self.state.iter())
            .map(|(&a, &n)| {
                (a as f64 + n).clamp(self.config.low, self.config.high) as f32
            })
            .collect()
    }

    fn sigma_at(&self, step: usize) -> f64 {
        let progress = if self.config.decay_period == 0 {
            1.0
        } else {
            (step as f64 / self.config.decay_period as f64).min(1.0)
        };
        self.config.max_sigma - (self.config.max_sigma - self.config.min_sigma) * progress
    }

    fn evolve(&mut self, sigma: f64) {
        for x in &mut self.state {
            let gaussian: f64 = self.rng.sample(StandardNormal);
            let dx = self.config.theta * (self.config.mu - *x) + sigma * gaussian;
            *x += dx;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_perturbs_within_bounds() {
        let mut noise = OuNoise::new(2, OuNoiseConfig::default());
        noise.reset(7);
        for step in 0..1_000 {
            let out = noise.apply(&[0.5, -0.5], step);
            assert_eq!(out.len(), 2);
            for &a in &out {
                assert!((-1.0..=1.0).contains(&a));
            }
        }
    }

    #[test]
    fn test_reset_makes_stream_repeatable() {
        let mut noise = OuNoise::new(3, OuNoiseConfig::default());
        noise.reset(42);
        let first: Vec<ActionVector> = (0..5).map(|t| noise.apply(&[0.0, 0.0, 0.0], t)).collect();
        noise.reset(42);
        let second: Vec<ActionVector> = (0..5).map(|t| noise.apply(&[0.0, 0.0, 0.0], t)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut noise = OuNoise::new(2, OuNoiseConfig::default());
        noise.reset(1);
        let a = noise.apply(&[0.0, 0.0], 0);
        noise.reset(2);
        let b = noise.apply(&[0.0, 0.0], 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sigma_decays_to_min() {
        let config = OuNoiseConfig::default().with_sigma(0.5, 0.1);
        let noise = OuNoise::new(1, config);
        assert!((noise.sigma_at(0) - 0.5).abs() < 1e-12);
        assert!((noise.sigma_at(50_000) - 0.3).abs() < 1e-12);
        assert!((noise.sigma_at(100_000) - 0.1).abs() < 1e-12);
        assert!((noise.sigma_at(1_000_000) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_mean_reversion_pulls_state_back() {
        // With no gaussian drive (sigma = 0), the state decays toward mu.
        let config = OuNoiseConfig::default().with_sigma(0.0, 0.0);
        let mut noise = OuNoise::new(1, config);
        noise.reset(0);
        noise.state[0] = 1.0;
        for t in 0..100 {
            noise.apply(&[0.0], t);
        }
        assert!(noise.state[0].abs() < 1e-4);
    }
}
