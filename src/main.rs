use anyhow::{bail, Context, Result};
use challenge_odds::config::PRESETS;
use challenge_odds::sweep::{cheapest, risk_grid, run_sweep, write_csv};
use challenge_odds::{ChallengeConfig, ChallengeReport};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "challenge-odds")]
#[command(about = "Prop firm challenge pass probability and cost simulator")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate pass probability, attempts and total cost
    Run {
        #[command(flatten)]
        challenge: ChallengeArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sweep risk per trade and write results to CSV
    Sweep {
        #[command(flatten)]
        challenge: ChallengeArgs,

        /// First risk value (%)
        #[arg(long, default_value = "0.25")]
        from: f64,

        /// Last risk value (%)
        #[arg(long, default_value = "3.0")]
        to: f64,

        /// Risk increment (%)
        #[arg(long, default_value = "0.25")]
        step: f64,

        /// Output CSV file
        #[arg(short, long, default_value = "sweep.csv")]
        output: PathBuf,
    },

    /// List built-in challenge presets
    Presets,
}

#[derive(clap::Args, Debug)]
struct ChallengeArgs {
    /// JSON config file (replaces the challenge flags below)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in preset (see `presets`; replaces the challenge flags below)
    #[arg(short, long, conflicts_with = "config")]
    preset: Option<String>,

    /// Win rate (%)
    #[arg(long, env = "CHALLENGE_WIN_RATE", default_value = "40")]
    win_rate: f64,

    /// Reward to risk ratio (2 = reward is twice the risk)
    #[arg(long, env = "CHALLENGE_RR", default_value = "2.0")]
    rr: f64,

    /// Risk per trade (%)
    #[arg(long, env = "CHALLENGE_RISK", default_value = "1.0")]
    risk: f64,

    /// Run a two-phase challenge
    #[arg(long, env = "CHALLENGE_TWO_PHASE")]
    two_phase: bool,

    /// Profit target for phase 1 or the only phase (%)
    #[arg(long, env = "CHALLENGE_TARGET", default_value = "10.0")]
    target: f64,

    /// Profit target for phase 2 (%), used with --two-phase
    #[arg(long, env = "CHALLENGE_PHASE2_TARGET", default_value = "5.0")]
    phase2_target: f64,

    /// Max drawdown (%)
    #[arg(long, env = "CHALLENGE_MAX_DD", default_value = "10.0")]
    max_dd: f64,

    /// Max trades per phase
    #[arg(long, env = "CHALLENGE_MAX_TRADES", default_value = "500")]
    max_trades: u32,

    /// Fee per attempt ($)
    #[arg(long, env = "CHALLENGE_FEE", default_value = "500")]
    fee: f64,

    /// Account size ($), display only
    #[arg(long, env = "CHALLENGE_ACCOUNT_SIZE", default_value = "100000")]
    account_size: f64,

    /// Monte Carlo simulations
    #[arg(short, long, env = "CHALLENGE_SIMULATIONS", default_value = "5000")]
    simulations: u32,

    /// RNG seed for reproducible runs
    #[arg(long, env = "CHALLENGE_SEED")]
    seed: Option<u64>,

    /// Run trials on all cores
    #[arg(long, env = "CHALLENGE_PARALLEL")]
    parallel: bool,
}

impl ChallengeArgs {
    /// Config file, then preset, then flags; seed and parallel always apply
    fn resolve(&self) -> Result<ChallengeConfig> {
        let mut config = if let Some(path) = &self.config {
            self.warn_ignored_flags(&format!("--config {}", path.display()));
            ChallengeConfig::load(path)?
        } else if let Some(name) = &self.preset {
            self.warn_ignored_flags(&format!("--preset {name}"));
            match ChallengeConfig::preset(name) {
                Some(config) => config,
                None => bail!("Unknown preset '{}' (available: {})", name, PRESETS.join(", ")),
            }
        } else {
            self.flag_config()
        };

        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.parallel |= self.parallel;
        Ok(config)
    }

    fn flag_config(&self) -> ChallengeConfig {
        ChallengeConfig {
            win_rate_pct: self.win_rate,
            reward_to_risk: self.rr,
            risk_per_trade_pct: self.risk,
            profit_target_pct: self.target,
            phase2_target_pct: self.two_phase.then_some(self.phase2_target),
            max_drawdown_pct: self.max_dd,
            max_trades: self.max_trades,
            fee_per_attempt: self.fee,
            account_size: self.account_size,
            simulations: self.simulations,
            seed: None,
            parallel: false,
        }
    }

    /// Challenge flags were moved off their defaults
    fn has_challenge_flags(&self) -> bool {
        let defaults = ChallengeConfig {
            phase2_target_pct: None,
            ..Default::default()
        };
        self.flag_config() != defaults
    }

    fn warn_ignored_flags(&self, source: &str) {
        if self.has_challenge_flags() {
            warn!("Challenge flags are ignored because {} was given", source);
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Commands::Run { challenge, json } => {
            let config = challenge.resolve()?;
            run_challenge(&config, json)?;
        }
        Commands::Sweep { challenge, from, to, step, output } => {
            let config = challenge.resolve()?;
            run_risk_sweep(&config, from, to, step, output)?;
        }
        Commands::Presets => {
            for name in PRESETS {
                if let Some(config) = ChallengeConfig::preset(name) {
                    let params = config.parameters()?;
                    println!(
                        "{:22} {} | risk {:.2}% | max DD {:.1}% | fee ${:.0}",
                        name, params.kind, config.risk_per_trade_pct, config.max_drawdown_pct,
                        config.fee_per_attempt
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_challenge(config: &ChallengeConfig, json: bool) -> Result<()> {
    let report = ChallengeReport::run(config).context("Simulation failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn run_risk_sweep(
    config: &ChallengeConfig,
    from: f64,
    to: f64,
    step: f64,
    output: PathBuf,
) -> Result<()> {
    let params = config.parameters()?;
    config.validate_money()?;
    let risks = risk_grid(from, to, step)?;

    let start = std::time::Instant::now();
    let rows = run_sweep(&params, &risks, &config.simulation(), config.fee_per_attempt)?;
    info!("Sweep finished in {:.1}s", start.elapsed().as_secs_f64());

    write_csv(&rows, &output)?;

    println!(
        "\n  {:>8} {:>11} {:>12} {:>10} {:>12}",
        "Risk %", "Pass Rate", "Avg Trades", "Attempts", "Total Cost"
    );
    println!("  {}", "-".repeat(57));
    for row in &rows {
        match (row.attempts_to_buy, row.total_cost) {
            (Some(attempts), Some(cost)) => println!(
                "  {:>8.2} {:>10.2}% {:>12.1} {:>10} {:>11.0}$",
                row.risk_per_trade_pct, row.pass_rate * 100.0, row.average_trades_to_pass,
                attempts, cost
            ),
            _ => println!(
                "  {:>8.2} {:>10.2}% {:>12} {:>10} {:>12}",
                row.risk_per_trade_pct, row.pass_rate * 100.0, "N/A", "N/A", "N/A"
            ),
        }
    }

    match cheapest(&rows) {
        Some(best) => info!(
            "Cheapest risk: {:.2}% (pass {:.2}%, total cost ${:.0})",
            best.risk_per_trade_pct,
            best.pass_rate * 100.0,
            best.total_cost.unwrap_or_default()
        ),
        None => warn!("No risk value produced a passing trial"),
    }

    Ok(())
}
