//! Diagnosis Engine
//!
//! Scores every rule against a set of observed symptoms and returns the
//! candidate diagnoses ranked by computed confidence.

mod config;
mod engine;

pub use config::EngineConfig;
pub use engine::{rank, DiagnosisEngine, DiagnosisResult};

use rule_store::StoreError;
use thiserror::Error;

/// Errors while preparing the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Rule base unavailable: {0}")]
    RuleBase(#[from] StoreError),
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}
