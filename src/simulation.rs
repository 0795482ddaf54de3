//! Monte Carlo aggregation over many challenge trials
//!
//! Every trial gets its own RNG stream derived from the run seed and the
//! trial index, so sequential and rayon-parallel runs with the same seed
//! produce identical statistics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::challenge::ChallengeParameters;
use crate::engine::{run_phase, PhaseExit};
use crate::error::{ChallengeError, Result};

/// Odd 64-bit constant used to spread trial indices across seed space
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// How many trials to run and how
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent trials (the pass-rate denominator)
    pub trials: u32,

    /// Base seed; drawn from the thread RNG when absent
    pub seed: Option<u64>,

    /// Spread trials over the rayon thread pool
    pub parallel: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 5_000,
            seed: None,
            parallel: false,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(ChallengeError::invalid("trials", 0.0, "at least 1 trial"));
        }
        Ok(())
    }
}

/// Outcome of one full challenge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    /// Every phase passed; `trades` is the total across phases
    Passed { trades: u32 },
    /// Failed in `phase` (1 or 2) for the given reason
    Failed { phase: u8, exit: PhaseExit },
}

/// Run phase 1 and, for two-phase challenges that pass it, phase 2.
pub fn run_trial<R: Rng + ?Sized>(params: &ChallengeParameters, rng: &mut R) -> TrialOutcome {
    let first = run_phase(params, params.kind.phase1_target(), rng);
    if !first.passed {
        return TrialOutcome::Failed { phase: 1, exit: first.exit };
    }

    match params.kind.phase2_target() {
        None => TrialOutcome::Passed { trades: first.trades_used },
        Some(target) => {
            let second = run_phase(params, target, rng);
            if second.passed {
                TrialOutcome::Passed {
                    trades: first.trades_used + second.trades_used,
                }
            } else {
                TrialOutcome::Failed { phase: 2, exit: second.exit }
            }
        }
    }
}

/// RNG for trial `index` of a run seeded with `seed`
pub fn trial_rng(seed: u64, index: u32) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64 + 1).wrapping_mul(SEED_STRIDE))
}

/// Use the configured seed or draw a fresh one
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::thread_rng().gen())
}

/// Running counts owned by one aggregation (or one rayon fold)
#[derive(Debug, Default, Clone)]
pub struct Tally {
    pub passed: u32,
    pub phase1_passed: u32,
    pub failed_drawdown: u32,
    pub failed_max_trades: u32,
    pub trades_to_pass: Vec<u32>,
}

impl Tally {
    pub fn record(&mut self, outcome: TrialOutcome, phase_count: u8) {
        match outcome {
            TrialOutcome::Passed { trades } => {
                self.passed += 1;
                if phase_count > 1 {
                    self.phase1_passed += 1;
                }
                self.trades_to_pass.push(trades);
            }
            TrialOutcome::Failed { phase, exit } => {
                if phase > 1 {
                    self.phase1_passed += 1;
                }
                match exit {
                    PhaseExit::Breached => self.failed_drawdown += 1,
                    PhaseExit::Exhausted => self.failed_max_trades += 1,
                    PhaseExit::Passed => {}
                }
            }
        }
    }

    pub fn merge(mut self, other: Tally) -> Tally {
        self.passed += other.passed;
        self.phase1_passed += other.phase1_passed;
        self.failed_drawdown += other.failed_drawdown;
        self.failed_max_trades += other.failed_max_trades;
        self.trades_to_pass.extend(other.trades_to_pass);
        self
    }

    /// Reduce counts into summary statistics over `trials` attempts
    pub fn finish(mut self, trials: u32, seed: u64, phase_count: u8) -> SimulationResult {
        let average_trades_to_pass = if self.trades_to_pass.is_empty() {
            0.0
        } else {
            let total: u64 = self.trades_to_pass.iter().map(|&t| t as u64).sum();
            total as f64 / self.trades_to_pass.len() as f64
        };

        self.trades_to_pass.sort_unstable();
        let median_trades_to_pass = self.trades_to_pass.get(self.trades_to_pass.len() / 2).copied();

        // Single-phase runs funnel straight through
        let phase1_passed = if phase_count > 1 { self.phase1_passed } else { self.passed };

        SimulationResult {
            trials,
            seed,
            passed: self.passed,
            pass_rate: self.passed as f64 / trials as f64,
            average_trades_to_pass,
            median_trades_to_pass,
            phase1_passed,
            failed_drawdown: self.failed_drawdown,
            failed_max_trades: self.failed_max_trades,
        }
    }
}

/// Summary statistics of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub trials: u32,
    /// Base seed; rerun with it to reproduce the result
    pub seed: u64,
    pub passed: u32,
    /// `passed / trials`
    pub pass_rate: f64,
    /// Mean trades over passing trials only, 0 when nothing passed
    pub average_trades_to_pass: f64,
    pub median_trades_to_pass: Option<u32>,
    /// Trials that cleared the first phase
    pub phase1_passed: u32,
    /// Failures caused by a drawdown breach, in either phase
    pub failed_drawdown: u32,
    /// Failures caused by running out of trades, in either phase
    pub failed_max_trades: u32,
}

impl SimulationResult {
    pub fn phase1_pass_rate(&self) -> f64 {
        self.phase1_passed as f64 / self.trials as f64
    }

    pub fn failed(&self) -> u32 {
        self.trials - self.passed
    }
}

/// Run `config.trials` trials of the challenge and summarize them.
pub fn simulate(
    params: &ChallengeParameters,
    config: &SimulationConfig,
) -> Result<SimulationResult> {
    params.validate()?;
    config.validate()?;

    let seed = resolve_seed(config.seed);
    let phase_count = params.kind.phase_count();

    info!(
        "Simulating {} trials of {} (seed {}, parallel: {})",
        config.trials, params.kind, seed, config.parallel
    );

    let tally = if config.parallel {
        (0..config.trials)
            .into_par_iter()
            .fold(Tally::default, |mut tally, index| {
                let outcome = run_trial(params, &mut trial_rng(seed, index));
                tally.record(outcome, phase_count);
                tally
            })
            .reduce(Tally::default, Tally::merge)
    } else {
        let mut tally = Tally::default();
        for index in 0..config.trials {
            let outcome = run_trial(params, &mut trial_rng(seed, index));
            tally.record(outcome, phase_count);
        }
        tally
    };

    debug!(
        "Tally: passed={} phase1_passed={} failed_dd={} failed_max_trades={}",
        tally.passed, tally.phase1_passed, tally.failed_drawdown, tally.failed_max_trades
    );

    let result = tally.finish(config.trials, seed, phase_count);

    info!(
        "Pass rate {:.2}% ({}/{}), avg trades to pass {:.1}",
        result.pass_rate * 100.0,
        result.passed,
        result.trials,
        result.average_trades_to_pass
    );

    Ok(result)
}
