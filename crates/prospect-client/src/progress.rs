//! Synthetic progress for a request that reports none.

/// Largest share of the remaining distance covered by one tick.
const MAX_STEP_FRACTION: f64 = 0.25;

/// Progress estimate that moves toward `ceiling` on every tick without ever
/// reaching it. Only [`ProgressEstimator::complete`] reaches 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEstimator {
    pct: f64,
    ceiling: f64,
}

impl ProgressEstimator {
    /// `ceiling` is clamped into `[0, 100)`.
    #[must_use]
    pub fn new(ceiling: f64) -> Self {
        let ceiling = if ceiling.is_finite() {
            ceiling.clamp(0.0, 99.9)
        } else {
            0.0
        };
        Self { pct: 0.0, ceiling }
    }

    #[must_use]
    pub fn pct(&self) -> f64 {
        self.pct
    }

    #[must_use]
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Advances by a random fraction of the remaining distance.
    pub fn tick(&mut self) -> f64 {
        self.advance(rand::random::<f64>())
    }

    /// Advances by `unit * 25%` of the remaining distance. `unit` is clamped
    /// into `[0, 1]`.
    pub fn advance(&mut self, unit: f64) -> f64 {
        let unit = if unit.is_finite() {
            unit.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if self.pct < self.ceiling {
            let next = self.pct + (self.ceiling - self.pct) * unit * MAX_STEP_FRACTION;
            // Float rounding must not land on the ceiling itself.
            if next < self.ceiling {
                self.pct = next;
            }
        }
        self.pct
    }

    pub fn complete(&mut self) {
        self.pct = 100.0;
    }

    pub fn reset(&mut self) {
        self.pct = 0.0;
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new(92.0)
    }
}
