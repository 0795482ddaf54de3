//! Risk Sweep Module
//!
//! Runs the challenge simulation across a grid of risk-per-trade values in
//! parallel. Every grid point reuses the same base seed, so differences
//! between rows come from the risk setting rather than from sampling noise.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::challenge::ChallengeParameters;
use crate::cost::CostProjection;
use crate::error::ChallengeError;
use crate::simulation::{resolve_seed, simulate, SimulationConfig};

/// One grid point of a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    pub risk_per_trade_pct: f64,
    pub pass_rate: f64,
    pub average_trades_to_pass: f64,
    pub expected_attempts: Option<f64>,
    pub attempts_to_buy: Option<u64>,
    pub total_cost: Option<f64>,
}

/// Upper bound on grid points per sweep
pub const MAX_GRID_POINTS: usize = 10_000;

/// Risk values from `start_pct` to `end_pct` inclusive, as fractions
pub fn risk_grid(start_pct: f64, end_pct: f64, step_pct: f64) -> Result<Vec<f64>, ChallengeError> {
    for (name, value) in [("start_pct", start_pct), ("end_pct", end_pct)] {
        if !(value > 0.0 && value < 100.0) {
            return Err(ChallengeError::InvalidParameter {
                name,
                value,
                expected: "a value in (0, 100)",
            });
        }
    }
    if !(step_pct > 0.0 && step_pct.is_finite()) {
        return Err(ChallengeError::InvalidParameter {
            name: "step_pct",
            value: step_pct,
            expected: "a finite value > 0",
        });
    }
    if !(end_pct >= start_pct) {
        return Err(ChallengeError::InvalidParameter {
            name: "end_pct",
            value: end_pct,
            expected: "a value >= start_pct",
        });
    }

    // Checked in f64 before the cast, which would saturate
    let span = (end_pct - start_pct) / step_pct + 1e-9;
    if span >= MAX_GRID_POINTS as f64 {
        return Err(ChallengeError::InvalidParameter {
            name: "step_pct",
            value: step_pct,
            expected: "a step giving at most 10000 grid points",
        });
    }

    // Integer stepping avoids drift from repeated float addition
    let steps = span.floor() as usize;
    Ok((0..=steps)
        .map(|i| (start_pct + i as f64 * step_pct) / 100.0)
        .collect())
}

/// Simulate `params` once per risk value; rows come back in grid order.
pub fn run_sweep(
    params: &ChallengeParameters,
    risks: &[f64],
    config: &SimulationConfig,
    fee_per_attempt: f64,
) -> Result<Vec<SweepRow>, ChallengeError> {
    let seed = resolve_seed(config.seed);
    let per_point = SimulationConfig {
        seed: Some(seed),
        parallel: false,
        ..*config
    };

    info!(
        "Sweeping {} risk values ({} trials each, seed {})",
        risks.len(),
        config.trials,
        seed
    );

    let total = risks.len();
    let completed = AtomicUsize::new(0);

    risks
        .par_iter()
        .map(|&risk| -> Result<SweepRow, ChallengeError> {
            let point = ChallengeParameters { risk_per_trade: risk, ..*params };
            let result = simulate(&point, &per_point)?;
            let cost = CostProjection::from_counts(result.passed, result.trials, fee_per_attempt);

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("[{}/{}] risk {:.2}% -> pass {:.2}%", done, total, risk * 100.0, result.pass_rate * 100.0);

            Ok(SweepRow {
                risk_per_trade_pct: risk * 100.0,
                pass_rate: result.pass_rate,
                average_trades_to_pass: result.average_trades_to_pass,
                expected_attempts: cost.map(|c| c.expected_attempts),
                attempts_to_buy: cost.map(|c| c.attempts_to_buy),
                total_cost: cost.map(|c| c.total_cost),
            })
        })
        .collect()
}

/// Row with the lowest projected total cost, ties broken by higher pass rate
pub fn cheapest(rows: &[SweepRow]) -> Option<&SweepRow> {
    rows.iter()
        .filter(|row| row.total_cost.is_some())
        .min_by(|a, b| {
            let cost_a = a.total_cost.unwrap_or(f64::INFINITY);
            let cost_b = b.total_cost.unwrap_or(f64::INFINITY);
            cost_a
                .total_cmp(&cost_b)
                .then_with(|| b.pass_rate.total_cmp(&a.pass_rate))
        })
}

pub fn write_csv(rows: &[SweepRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!("Wrote {} sweep rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::ChallengeKind;

    fn params() -> ChallengeParameters {
        ChallengeParameters {
            win_probability: 0.45,
            reward_to_risk: 2.0,
            risk_per_trade: 0.01,
            max_drawdown: 0.10,
            max_trades: 300,
            kind: ChallengeKind::SinglePhase { profit_target: 0.08 },
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig { trials: 300, seed: Some(77), parallel: false }
    }

    #[test]
    fn test_grid_is_inclusive() {
        let grid = risk_grid(0.5, 2.0, 0.5).unwrap();
        assert_eq!(grid.len(), 4);
        assert!((grid[0] - 0.005).abs() < 1e-12);
        assert!((grid[3] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_grid_rejects_bad_ranges() {
        assert!(risk_grid(1.0, 2.0, 0.0).is_err());
        assert!(risk_grid(2.0, 1.0, 0.5).is_err());
        assert_eq!(risk_grid(1.0, 1.0, 0.5).unwrap().len(), 1);
    }

    #[test]
    fn test_grid_rejects_endpoints_outside_percent_range() {
        for (start, end) in [(0.0, 3.0), (-1.0, 3.0), (1.0, 100.0), (1.0, f64::INFINITY), (f64::NAN, 2.0)] {
            assert!(risk_grid(start, end, 0.5).is_err(), "{start}..{end} should be rejected");
        }
    }

    #[test]
    fn test_grid_size_is_bounded() {
        for step in [1e-300, f64::MIN_POSITIVE, 1e-4] {
            match risk_grid(0.25, 3.0, step) {
                Err(ChallengeError::InvalidParameter { name, .. }) => assert_eq!(name, "step_pct"),
                other => panic!("step {step} should be rejected, got {other:?}"),
            }
        }
        assert!(risk_grid(0.01, 99.0, f64::INFINITY).is_err());

        let grid = risk_grid(0.01, 99.0, 0.01).unwrap();
        assert!(grid.len() <= MAX_GRID_POINTS);
    }

    #[test]
    fn test_rows_keep_grid_order() {
        let grid = risk_grid(0.5, 2.5, 0.5).unwrap();
        let rows = run_sweep(&params(), &grid, &config(), 100.0).unwrap();

        assert_eq!(rows.len(), grid.len());
        for (row, risk) in rows.iter().zip(&grid) {
            assert!((row.risk_per_trade_pct - risk * 100.0).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&row.pass_rate));
            assert_eq!(row.total_cost.is_some(), row.pass_rate > 0.0);
        }
    }

    #[test]
    fn test_sweep_matches_direct_simulation() {
        let rows = run_sweep(&params(), &[0.015], &config(), 100.0).unwrap();
        let direct = simulate(
            &ChallengeParameters { risk_per_trade: 0.015, ..params() },
            &config(),
        )
        .unwrap();
        assert_eq!(rows[0].pass_rate, direct.pass_rate);
    }

    #[test]
    fn test_invalid_risk_fails_sweep() {
        assert!(run_sweep(&params(), &[0.01, 1.0], &config(), 100.0).is_err());
    }

    #[test]
    fn test_cheapest_skips_impossible_rows() {
        let row = |risk: f64, pass_rate: f64, cost: Option<f64>| SweepRow {
            risk_per_trade_pct: risk,
            pass_rate,
            average_trades_to_pass: 10.0,
            expected_attempts: None,
            attempts_to_buy: None,
            total_cost: cost,
        };
        let rows = vec![
            row(0.5, 0.0, None),
            row(1.0, 0.4, Some(1500.0)),
            row(1.5, 0.5, Some(1000.0)),
            row(2.0, 0.6, Some(1000.0)),
        ];

        let best = cheapest(&rows).unwrap();
        assert_eq!(best.risk_per_trade_pct, 2.0);
        assert!(cheapest(&rows[..1]).is_none());
    }

    #[test]
    fn test_write_csv() {
        let rows = run_sweep(&params(), &[0.01, 0.02], &config(), 100.0).unwrap();
        let path = std::env::temp_dir().join(format!("challenge-sweep-{}.csv", std::process::id()));

        write_csv(&rows, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("risk_per_trade_pct,pass_rate"));
        assert_eq!(lines.count(), 2);
    }
}
