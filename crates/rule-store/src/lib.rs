//! Rule Store
//!
//! Owns the persisted symptom→diagnosis rule collection: the rule model,
//! the two on-disk record shapes, identifier allocation and the
//! load/mutate/save cycle used by both the curation and query paths.

mod collection;
mod record;
mod rule;
mod store;

pub use collection::{select_symptoms, RuleCollection};
pub use record::{decode_collection, encode_collection, RecordShape};
pub use rule::{normalize_conditions, Recommendation, Rule, RuleId};
pub use store::{read_collection, DeleteOutcome, RuleDraft, RulePatch, RuleStore};

use std::path::PathBuf;
use thiserror::Error;

/// Rule store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Mandatory rule file does not exist
    #[error("Rule file not found: {0}")]
    FileNotFound(PathBuf),
    /// Structured content could not be parsed into rules
    #[error("Invalid rule file format: {0}")]
    FormatInvalid(String),
    /// A required curation field was left empty
    #[error("Field '{0}' must not be empty")]
    ValidationFailed(&'static str),
    /// Referenced rule id is not in the collection
    #[error("Rule {0} not found")]
    NotFound(RuleId),
    /// Operator input that cannot be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(String),
    /// Poisoned collection lock
    #[error("Lock error: {0}")]
    Lock(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::FormatInvalid(err.to_string())
    }
}
