//! Trial engine: plays out one challenge phase trade by trade
//!
//! The account is normalized to a starting balance of 1.0. Each trade either
//! compounds the balance up by `risk * reward_to_risk` or down by `risk`, so
//! the balance stays positive for any risk below 100%.

use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeParameters;

/// Why a phase stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseExit {
    /// Profit target reached
    Passed,
    /// Drawdown from the running peak hit the limit
    Breached,
    /// Ran out of trades with neither target nor limit hit
    Exhausted,
}

/// Result of a single phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub passed: bool,
    /// Trades executed, including the one that ended the phase
    pub trades_used: u32,
    pub exit: PhaseExit,
}

impl PhaseOutcome {
    fn new(exit: PhaseExit, trades_used: u32) -> Self {
        Self {
            passed: exit == PhaseExit::Passed,
            trades_used,
            exit,
        }
    }
}

/// Simulate one phase against `profit_target`.
///
/// Ranges are not checked here; call [`ChallengeParameters::validate`] first.
/// The pass check runs before the drawdown check on every trade.
pub fn run_phase<R: Rng + ?Sized>(
    params: &ChallengeParameters,
    profit_target: f64,
    rng: &mut R,
) -> PhaseOutcome {
    let draw = Uniform::new(0.0f64, 1.0);
    let win_mult = params.win_multiplier();
    let loss_mult = params.loss_multiplier();

    let mut balance = 1.0f64;
    let mut peak = 1.0f64;

    for trade in 1..=params.max_trades {
        if draw.sample(rng) < params.win_probability {
            balance *= win_mult;
        } else {
            balance *= loss_mult;
        }

        peak = peak.max(balance);
        let drawdown = 1.0 - balance / peak;

        if balance - 1.0 >= profit_target {
            return PhaseOutcome::new(PhaseExit::Passed, trade);
        }
        if drawdown >= params.max_drawdown {
            return PhaseOutcome::new(PhaseExit::Breached, trade);
        }
    }

    PhaseOutcome::new(PhaseExit::Exhausted, params.max_trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(win_probability: f64) -> ChallengeParameters {
        ChallengeParameters {
            win_probability,
            reward_to_risk: 2.0,
            risk_per_trade: 0.01,
            max_drawdown: 0.10,
            max_trades: 500,
            kind: ChallengeKind::SinglePhase { profit_target: 0.10 },
        }
    }

    #[test]
    fn test_always_winning_passes_deterministically() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = params(1.0);

        // 1.02^4 = 1.0824, 1.02^5 = 1.1041
        let outcome = run_phase(&p, 0.10, &mut rng);
        assert!(outcome.passed);
        assert_eq!(outcome.exit, PhaseExit::Passed);
        assert_eq!(outcome.trades_used, 5);
    }

    #[test]
    fn test_single_trade_clears_small_target() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = params(1.0);

        let outcome = run_phase(&p, 0.02, &mut rng);
        assert!(outcome.passed);
        assert_eq!(outcome.trades_used, 1);
    }

    #[test]
    fn test_always_losing_breaches() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = params(0.0);

        // 0.99^10 leaves a 9.56% drawdown, 0.99^11 a 10.47% one
        let outcome = run_phase(&p, 0.10, &mut rng);
        assert!(!outcome.passed);
        assert_eq!(outcome.exit, PhaseExit::Breached);
        assert_eq!(outcome.trades_used, 11);
    }

    #[test]
    fn test_exhaustion_reports_max_trades() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = ChallengeParameters { max_trades: 5, ..params(0.0) };

        let outcome = run_phase(&p, 0.10, &mut rng);
        assert!(!outcome.passed);
        assert_eq!(outcome.exit, PhaseExit::Exhausted);
        assert_eq!(outcome.trades_used, 5);
    }

    #[test]
    fn test_pass_checked_before_breach() {
        // A single 50% loss crosses both a -50% target and a 10% drawdown limit
        let mut rng = StdRng::seed_from_u64(3);
        let p = ChallengeParameters {
            risk_per_trade: 0.5,
            max_trades: 10,
            ..params(0.0)
        };

        let outcome = run_phase(&p, -0.5, &mut rng);
        assert_eq!(outcome.exit, PhaseExit::Passed);
        assert_eq!(outcome.trades_used, 1);
    }

    #[test]
    fn test_tighter_drawdown_breaches_sooner() {
        let p = ChallengeParameters {
            win_probability: 0.0,
            max_drawdown: 0.05,
            ..params(0.0)
        };
        let mut rng = StdRng::seed_from_u64(11);

        // 0.99^5 = 0.951 -> 4.9% drawdown, 0.99^6 -> 5.85%
        let outcome = run_phase(&p, 1.0, &mut rng);
        assert_eq!(outcome.exit, PhaseExit::Breached);
        assert_eq!(outcome.trades_used, 6);
    }

    #[test]
    fn test_same_seed_same_outcomes() {
        let p = params(0.45);
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);

        let first: Vec<PhaseOutcome> = (0..200).map(|_| run_phase(&p, 0.10, &mut a)).collect();
        let second: Vec<PhaseOutcome> = (0..200).map(|_| run_phase(&p, 0.10, &mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_trades_used_within_bounds() {
        let p = ChallengeParameters { max_trades: 50, ..params(0.5) };
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..500 {
            let outcome = run_phase(&p, 0.10, &mut rng);
            assert!(outcome.trades_used >= 1);
            assert!(outcome.trades_used <= 50);
            assert_eq!(outcome.passed, outcome.exit == PhaseExit::Passed);
        }
    }
}
