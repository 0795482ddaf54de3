// Library crate - Monte Carlo odds and cost of passing a prop firm challenge

pub mod challenge;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod report;
pub mod simulation;
pub mod sweep;

// Re-export commonly used types
pub use challenge::{ChallengeKind, ChallengeParameters};
pub use config::ChallengeConfig;
pub use cost::CostProjection;
pub use engine::{run_phase, PhaseExit, PhaseOutcome};
pub use error::ChallengeError;
pub use report::ChallengeReport;
pub use simulation::{simulate, SimulationConfig, SimulationResult};
