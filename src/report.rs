//! Complete run: simulate, project cost, render

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::challenge::{ChallengeKind, ChallengeParameters};
use crate::config::ChallengeConfig;
use crate::cost::CostProjection;
use crate::error::Result;
use crate::simulation::{simulate, SimulationResult};

/// Everything a caller needs to present one simulation run
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeReport {
    pub generated_at: DateTime<Utc>,
    pub parameters: ChallengeParameters,
    pub account_size: f64,
    pub result: SimulationResult,
    /// Absent when no trial passed
    pub cost: Option<CostProjection>,
}

impl ChallengeReport {
    /// Validate `config`, run the simulation and attach the cost projection
    pub fn run(config: &ChallengeConfig) -> Result<Self> {
        let parameters = config.parameters()?;
        config.validate_money()?;

        let result = simulate(&parameters, &config.simulation())?;
        let cost = CostProjection::from_counts(result.passed, result.trials, config.fee_per_attempt);

        Ok(Self {
            generated_at: Utc::now(),
            parameters,
            account_size: config.account_size,
            result,
            cost,
        })
    }

    /// Profit targets in account currency
    pub fn target_amounts(&self) -> Vec<f64> {
        let mut amounts = vec![self.parameters.kind.phase1_target() * self.account_size];
        if let Some(target) = self.parameters.kind.phase2_target() {
            amounts.push(target * self.account_size);
        }
        amounts
    }

    pub fn drawdown_amount(&self) -> f64 {
        self.parameters.max_drawdown * self.account_size
    }
}

impl fmt::Display for ChallengeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        let r = &self.result;
        let rule = "=".repeat(60);

        writeln!(f, "{rule}")?;
        writeln!(f, "CHALLENGE: {}", p.kind)?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Win Rate: {:.1}% | RR: {:.2} | Risk/trade: {:.2}%",
            p.win_probability * 100.0,
            p.reward_to_risk,
            p.risk_per_trade * 100.0
        )?;
        writeln!(
            f,
            "Max DD: {:.2}% | Max trades/phase: {}",
            p.max_drawdown * 100.0,
            p.max_trades
        )?;
        if self.account_size > 0.0 {
            let targets: Vec<String> = self
                .target_amounts()
                .iter()
                .map(|amount| format!("${amount:.0}"))
                .collect();
            writeln!(
                f,
                "Account: ${:.0} | Target(s): {} | Max DD: ${:.0}",
                self.account_size,
                targets.join(" / "),
                self.drawdown_amount()
            )?;
        }
        writeln!(f)?;
        writeln!(f, "SIMULATION RESULTS ({} runs, seed {}):", r.trials, r.seed)?;
        writeln!(f, "{}", "-".repeat(40))?;

        let pct = |n: u32| n as f64 / r.trials as f64 * 100.0;
        writeln!(f, "  PASSED:           {} ({:.2}%)", r.passed, r.pass_rate * 100.0)?;
        if matches!(p.kind, ChallengeKind::TwoPhase { .. }) {
            writeln!(f, "  Passed phase 1:   {} ({:.2}%)", r.phase1_passed, pct(r.phase1_passed))?;
        }
        writeln!(f, "  Failed (DD):      {} ({:.2}%)", r.failed_drawdown, pct(r.failed_drawdown))?;
        writeln!(f, "  Failed (timeout): {} ({:.2}%)", r.failed_max_trades, pct(r.failed_max_trades))?;
        writeln!(f)?;
        writeln!(f, "  Avg trades to pass: {:.1}", r.average_trades_to_pass)?;
        if let Some(median) = r.median_trades_to_pass {
            writeln!(f, "  Median trades:      {median}")?;
        }

        match &self.cost {
            Some(cost) => {
                writeln!(f, "  Expected attempts:  {:.2}", cost.expected_attempts)?;
                writeln!(f, "  Attempts to buy:    {}", cost.attempts_to_buy)?;
                write!(f, "  Total cost:         ${:.0}", cost.total_cost)?;
            }
            None => {
                write!(
                    f,
                    "  Pass rate is zero with these parameters; passing is statistically \
                     impossible in this sample. Adjust the inputs."
                )?;
            }
        }
        Ok(())
    }
}
