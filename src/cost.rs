//! Expected attempts and spend needed to pass once

use serde::{Deserialize, Serialize};

/// Attempts and money needed to pass, treating attempts as a geometric trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostProjection {
    /// `1 / pass_rate`
    pub expected_attempts: f64,
    /// Expected attempts rounded up to whole purchases
    pub attempts_to_buy: u64,
    pub fee_per_attempt: f64,
    /// `attempts_to_buy * fee_per_attempt`
    pub total_cost: f64,
}

impl CostProjection {
    /// Returns `None` when the sample has no passes; there is no finite
    /// expectation to report in that case.
    pub fn from_pass_rate(pass_rate: f64, fee_per_attempt: f64) -> Option<Self> {
        if !(pass_rate > 0.0) {
            return None;
        }

        let expected_attempts = 1.0 / pass_rate;

        // 1 / (1/49) lands a few ulps above 49; don't buy a 50th attempt for it
        let nearest = expected_attempts.round();
        let attempts_to_buy = if (expected_attempts - nearest).abs() <= 1e-9 * nearest {
            nearest as u64
        } else {
            expected_attempts.ceil() as u64
        };

        Some(Self::new(expected_attempts, attempts_to_buy, fee_per_attempt))
    }

    /// Exact projection from trial counts: `ceil(trials / passed)` in integers
    pub fn from_counts(passed: u32, trials: u32, fee_per_attempt: f64) -> Option<Self> {
        if passed == 0 || trials == 0 {
            return None;
        }

        let expected_attempts = trials as f64 / passed as f64;
        let attempts_to_buy = trials.div_ceil(passed) as u64;
        Some(Self::new(expected_attempts, attempts_to_buy, fee_per_attempt))
    }

    fn new(expected_attempts: f64, attempts_to_buy: u64, fee_per_attempt: f64) -> Self {
        Self {
            expected_attempts,
            attempts_to_buy,
            fee_per_attempt,
            total_cost: attempts_to_buy as f64 * fee_per_attempt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_attempts_up() {
        let cost = CostProjection::from_pass_rate(0.30, 500.0).unwrap();
        assert!((cost.expected_attempts - 3.3333).abs() < 1e-3);
        assert_eq!(cost.attempts_to_buy, 4);
        assert_eq!(cost.total_cost, 2000.0);
    }

    #[test]
    fn test_exact_reciprocal_is_not_rounded_up() {
        let cost = CostProjection::from_pass_rate(0.5, 99.0).unwrap();
        assert_eq!(cost.expected_attempts, 2.0);
        assert_eq!(cost.attempts_to_buy, 2);
        assert_eq!(cost.total_cost, 198.0);

        let cost = CostProjection::from_pass_rate(1.0, 250.0).unwrap();
        assert_eq!(cost.attempts_to_buy, 1);
        assert_eq!(cost.total_cost, 250.0);
    }

    #[test]
    fn test_zero_pass_rate_has_no_projection() {
        assert!(CostProjection::from_pass_rate(0.0, 500.0).is_none());
        assert!(CostProjection::from_pass_rate(f64::NAN, 500.0).is_none());
    }

    #[test]
    fn test_free_challenge_costs_nothing() {
        let cost = CostProjection::from_pass_rate(0.1, 0.0).unwrap();
        assert_eq!(cost.total_cost, 0.0);
    }

    #[test]
    fn test_reciprocal_rates_do_not_buy_extra_attempt() {
        let cost = CostProjection::from_pass_rate(1.0 / 49.0, 500.0).unwrap();
        assert_eq!(cost.attempts_to_buy, 49);
        assert_eq!(cost.total_cost, 24_500.0);

        for n in 1..=1_000u64 {
            let cost = CostProjection::from_pass_rate(1.0 / n as f64, 1.0).unwrap();
            assert_eq!(cost.attempts_to_buy, n, "pass rate 1/{n}");
        }
    }

    #[test]
    fn test_counts_use_integer_ceiling() {
        let cost = CostProjection::from_counts(20, 980, 500.0).unwrap();
        assert_eq!(cost.attempts_to_buy, 49);
        assert_eq!(cost.total_cost, 24_500.0);
        assert!((cost.expected_attempts - 49.0).abs() < 1e-9);

        let cost = CostProjection::from_counts(3, 10, 500.0).unwrap();
        assert_eq!(cost.attempts_to_buy, 4);
        assert_eq!(cost.total_cost, 2000.0);
    }

    #[test]
    fn test_counts_without_passes_have_no_projection() {
        assert!(CostProjection::from_counts(0, 1_000, 500.0).is_none());
    }
}
