//! Error types for parameter validation

use thiserror::Error;

/// Errors raised before any trial is run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChallengeError {
    /// A numeric input is outside the range the engine accepts
    #[error("invalid parameter `{name}` = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
}

impl ChallengeError {
    pub(crate) fn invalid(name: &'static str, value: f64, expected: &'static str) -> Self {
        Self::InvalidParameter { name, value, expected }
    }
}

pub type Result<T> = std::result::Result<T, ChallengeError>;
