//! Importance-sampling bias-correction schedule.
//!
//! `beta` anneals linearly from its start value toward the end value as
//! training episodes progress, correcting prioritized-sampling bias more
//! aggressively late in training when the policy is closer to converged.

/// Linear beta annealing over a fixed episode horizon.
#[derive(Debug, Clone, Copy)]
pub struct BetaSchedule {
    start: f64,
    end: f64,
    horizon_episodes: u64,
}

impl BetaSchedule {
    /// Create a schedule from `start` to `end` over `horizon_episodes`.
    ///
    /// # Panics (debug only)
    ///
    /// Panics if either endpoint is non-finite or outside `[0, 1]`.
    pub fn new(start: f64, end: f64, horizon_episodes: u64) -> Self {
        debug_assert!(
            start.is_finite() && (0.0..=1.0).contains(&start),
            "BetaSchedule: start must be in [0, 1], got {}",
            start
        );
        debug_assert!(
            end.is_finite() && (0.0..=1.0).contains(&end),
            "BetaSchedule: end must be in [0, 1], got {}",
            end
        );
        Self {
            start,
            end,
            horizon_episodes,
        }
    }

    /// Beta at a given global episode count.
    ///
    /// Past the horizon (or with a zero horizon) this saturates at `end`.
    pub fn beta_at(&self, episode: u64) -> f64 {
        if self.horizon_episodes == 0 || episode >= self.horizon_episodes {
            return self.end;
        }
        let progress = episode as f64 / self.horizon_episodes as f64;
        self.start + (self.end - self.start) * progress
    }
}
