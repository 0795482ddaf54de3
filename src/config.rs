//! User-facing challenge configuration
//!
//! Values are percentages and currency amounts as a trader would enter them.
//! [`ChallengeConfig::parameters`] converts them into the fractional
//! [`ChallengeParameters`] the engine works with.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::challenge::{ChallengeKind, ChallengeParameters};
use crate::error::ChallengeError;
use crate::simulation::SimulationConfig;

/// Names accepted by [`ChallengeConfig::preset`]
pub const PRESETS: &[&str] = &["classic-two-phase", "one-step", "aggressive-one-step"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeConfig {
    /// Win rate (%)
    pub win_rate_pct: f64,

    /// Reward multiple of risk (2.0 = reward is twice the risk)
    pub reward_to_risk: f64,

    /// Risk per trade (% of balance)
    pub risk_per_trade_pct: f64,

    /// Profit target for phase 1, or the only phase (%)
    pub profit_target_pct: f64,

    /// Profit target for phase 2 (%); `None` means a single-phase challenge
    pub phase2_target_pct: Option<f64>,

    /// Max drawdown from peak (%)
    pub max_drawdown_pct: f64,

    /// Trade limit per phase
    pub max_trades: u32,

    /// Price of one challenge attempt
    pub fee_per_attempt: f64,

    /// Account size, used only to show targets in currency
    pub account_size: f64,

    /// Monte Carlo trials
    pub simulations: u32,

    pub seed: Option<u64>,

    pub parallel: bool,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            win_rate_pct: 40.0,
            reward_to_risk: 2.0,
            risk_per_trade_pct: 1.0,
            profit_target_pct: 10.0,
            phase2_target_pct: Some(5.0),
            max_drawdown_pct: 10.0,
            max_trades: 500,
            fee_per_attempt: 500.0,
            account_size: 100_000.0,
            simulations: 5_000,
            seed: None,
            parallel: false,
        }
    }
}

impl ChallengeConfig {
    /// Common firm layouts
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            // 10% / 5% targets, 10% max drawdown
            "classic-two-phase" => Some(Self::default()),
            // 10% target, 6% trailing drawdown
            "one-step" => Some(Self {
                profit_target_pct: 10.0,
                phase2_target_pct: None,
                max_drawdown_pct: 6.0,
                fee_per_attempt: 550.0,
                ..Default::default()
            }),
            // Same rules, double the risk per trade
            "aggressive-one-step" => Some(Self {
                risk_per_trade_pct: 2.0,
                profit_target_pct: 10.0,
                phase2_target_pct: None,
                max_drawdown_pct: 6.0,
                fee_per_attempt: 550.0,
                ..Default::default()
            }),
            _ => None,
        }
    }

    /// Load a JSON config; missing fields fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn kind(&self) -> ChallengeKind {
        let phase1 = self.profit_target_pct / 100.0;
        match self.phase2_target_pct {
            None => ChallengeKind::SinglePhase { profit_target: phase1 },
            Some(phase2) => ChallengeKind::TwoPhase {
                phase1_target: phase1,
                phase2_target: phase2 / 100.0,
            },
        }
    }

    /// Engine parameters in fractional form, validated
    pub fn parameters(&self) -> Result<ChallengeParameters, ChallengeError> {
        let params = ChallengeParameters {
            win_probability: self.win_rate_pct / 100.0,
            reward_to_risk: self.reward_to_risk,
            risk_per_trade: self.risk_per_trade_pct / 100.0,
            max_drawdown: self.max_drawdown_pct / 100.0,
            max_trades: self.max_trades,
            kind: self.kind(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            trials: self.simulations,
            seed: self.seed,
            parallel: self.parallel,
        }
    }

    /// Fee and account size must be non-negative
    pub fn validate_money(&self) -> Result<(), ChallengeError> {
        if !(self.fee_per_attempt >= 0.0 && self.fee_per_attempt.is_finite()) {
            return Err(ChallengeError::InvalidParameter {
                name: "fee_per_attempt",
                value: self.fee_per_attempt,
                expected: "a finite value >= 0",
            });
        }
        if !(self.account_size >= 0.0 && self.account_size.is_finite()) {
            return Err(ChallengeError::InvalidParameter {
                name: "account_size",
                value: self.account_size,
                expected: "a finite value >= 0",
            });
        }
        Ok(())
    }
}
