//! Challenge rules: profit targets, drawdown limit and trade sizing
//!
//! All quantities are fractions of the starting balance (0.10 = 10%).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ChallengeError, Result};

/// Phase layout of a challenge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeKind {
    /// One phase, one profit target
    SinglePhase { profit_target: f64 },
    /// Evaluation followed by verification, each with its own target
    TwoPhase { phase1_target: f64, phase2_target: f64 },
}

impl ChallengeKind {
    pub fn phase_count(&self) -> u8 {
        match self {
            Self::SinglePhase { .. } => 1,
            Self::TwoPhase { .. } => 2,
        }
    }

    /// Target of the first (or only) phase
    pub fn phase1_target(&self) -> f64 {
        match *self {
            Self::SinglePhase { profit_target } => profit_target,
            Self::TwoPhase { phase1_target, .. } => phase1_target,
        }
    }

    pub fn phase2_target(&self) -> Option<f64> {
        match *self {
            Self::SinglePhase { .. } => None,
            Self::TwoPhase { phase2_target, .. } => Some(phase2_target),
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SinglePhase { profit_target } => {
                write!(f, "1-phase ({:.2}% target)", profit_target * 100.0)
            }
            Self::TwoPhase { phase1_target, phase2_target } => write!(
                f,
                "2-phase ({:.2}% then {:.2}% target)",
                phase1_target * 100.0,
                phase2_target * 100.0
            ),
        }
    }
}

/// Trader profile and challenge rules fed to the trial engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChallengeParameters {
    /// Probability that a single trade wins, in [0, 1]
    pub win_probability: f64,

    /// Reward multiple of the risked amount on a winning trade
    pub reward_to_risk: f64,

    /// Fraction of the current balance risked per trade, in (0, 1)
    pub risk_per_trade: f64,

    /// Maximum decline from the running peak, in (0, 1]
    pub max_drawdown: f64,

    /// Trades allowed per phase before it counts as failed
    pub max_trades: u32,

    pub kind: ChallengeKind,
}

impl Default for ChallengeParameters {
    fn default() -> Self {
        Self {
            win_probability: 0.40,
            reward_to_risk: 2.0,
            risk_per_trade: 0.01,
            max_drawdown: 0.10,
            max_trades: 500,
            kind: ChallengeKind::TwoPhase {
                phase1_target: 0.10,
                phase2_target: 0.05,
            },
        }
    }
}

impl ChallengeParameters {
    /// Balance multiplier applied on a winning trade
    pub fn win_multiplier(&self) -> f64 {
        1.0 + self.risk_per_trade * self.reward_to_risk
    }

    /// Balance multiplier applied on a losing trade
    pub fn loss_multiplier(&self) -> f64 {
        1.0 - self.risk_per_trade
    }

    /// Per-trade expectancy in R multiples
    pub fn expectancy(&self) -> f64 {
        self.win_probability * self.reward_to_risk - (1.0 - self.win_probability)
    }

    /// Reject out-of-range inputs instead of clamping them
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.win_probability) {
            return Err(ChallengeError::invalid(
                "win_probability",
                self.win_probability,
                "a value in [0, 1]",
            ));
        }
        if !(self.reward_to_risk > 0.0 && self.reward_to_risk.is_finite()) {
            return Err(ChallengeError::invalid(
                "reward_to_risk",
                self.reward_to_risk,
                "a finite value > 0",
            ));
        }
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade < 1.0) {
            return Err(ChallengeError::invalid(
                "risk_per_trade",
                self.risk_per_trade,
                "a value in (0, 1)",
            ));
        }
        if !(self.max_drawdown > 0.0 && self.max_drawdown <= 1.0) {
            return Err(ChallengeError::invalid(
                "max_drawdown",
                self.max_drawdown,
                "a value in (0, 1]",
            ));
        }
        if self.max_trades == 0 {
            return Err(ChallengeError::invalid("max_trades", 0.0, "at least 1 trade"));
        }

        check_target("profit_target", self.kind.phase1_target())?;
        if let Some(target) = self.kind.phase2_target() {
            check_target("phase2_target", target)?;
        }
        Ok(())
    }
}

fn check_target(name: &'static str, target: f64) -> Result<()> {
    if target > 0.0 && target.is_finite() {
        Ok(())
    } else {
        Err(ChallengeError::invalid(name, target, "a finite value > 0"))
    }
}
