//! Obstacle-proximity penalty curves

use crate::common::ObstacleCostPolicy;

/// `weight` at or below `safe_dist`, falling linearly to zero at `clearing_dist`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFalloff {
    pub weight: f64,
}

impl Default for LinearFalloff {
    fn default() -> Self {
        Self { weight: 2.0 }
    }
}

impl ObstacleCostPolicy for LinearFalloff {
    fn penalty(&self, distance: f64, safe_dist: f64, clearing_dist: f64) -> f64 {
        if distance >= clearing_dist {
            return 0.0;
        }
        if distance <= safe_dist {
            return self.weight;
        }
        self.weight * (clearing_dist - distance) / (clearing_dist - safe_dist)
    }
}

/// Exponential decay from `weight` at `safe_dist`, cut to zero at `clearing_dist`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialFalloff {
    pub weight: f64,
    /// Decay rate [1/m]
    pub decay: f64,
}

impl Default for ExponentialFalloff {
    fn default() -> Self {
        Self {
            weight: 2.0,
            decay: 3.0,
        }
    }
}

impl ObstacleCostPolicy for ExponentialFalloff {
    fn penalty(&self, distance: f64, safe_dist: f64, clearing_dist: f64) -> f64 {
        if distance >= clearing_dist {
            return 0.0;
        }
        if distance <= safe_dist {
            return self.weight;
        }
        self.weight * (-self.decay * (distance - safe_dist)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_monotone(policy: &dyn ObstacleCostPolicy) {
        let mut last = f64::INFINITY;
        for i in 0..40 {
            let d = i as f64 * 0.1;
            let p = policy.penalty(d, 0.5, 2.0);
            assert!(p <= last, "penalty increased at {}", d);
            assert!(p >= 0.0);
            last = p;
        }
        assert_eq!(policy.penalty(2.0, 0.5, 2.0), 0.0);
        assert_eq!(policy.penalty(f64::INFINITY, 0.5, 2.0), 0.0);
    }

    #[test]
    fn test_linear_falloff() {
        let policy = LinearFalloff { weight: 4.0 };
        assert_relative_eq!(policy.penalty(0.1, 0.5, 1.5), 4.0);
        assert_relative_eq!(policy.penalty(1.0, 0.5, 1.5), 2.0);
        assert_monotone(&policy);
    }

    #[test]
    fn test_exponential_falloff() {
        let policy = ExponentialFalloff::default();
        assert_relative_eq!(policy.penalty(0.5, 0.5, 2.0), 2.0);
        assert!(policy.penalty(1.0, 0.5, 2.0) < 2.0);
        assert_monotone(&policy);
    }

    #[test]
    fn test_degenerate_band() {
        let policy = LinearFalloff::default();
        assert_eq!(policy.penalty(1.0, 1.0, 1.0), 0.0);
        assert_eq!(policy.penalty(0.9, 1.0, 1.0), 2.0);
    }
}
