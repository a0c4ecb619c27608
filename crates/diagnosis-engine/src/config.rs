//! Engine configuration

use crate::EngineError;
use serde::{Deserialize, Serialize};

/// Scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum fraction of a rule's conditions that must be observed.
    /// Zero-overlap rules are always excluded, whatever this value.
    pub min_match_ratio: f64,
    /// Decimal places kept on computed confidence
    pub decimals: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_match_ratio: 0.0,
            decimals: 2,
        }
    }
}

impl EngineConfig {
    /// Only report rules with at least half of their conditions observed
    pub fn strict() -> Self {
        Self {
            min_match_ratio: 0.5,
            ..Default::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.min_match_ratio) {
            return Err(EngineError::InvalidConfig(format!(
                "min_match_ratio {} is outside [0, 1]",
                self.min_match_ratio
            )));
        }
        if self.decimals > 10 {
            return Err(EngineError::InvalidConfig(format!(
                "decimals {} exceeds 10",
                self.decimals
            )));
        }
        Ok(())
    }
}
