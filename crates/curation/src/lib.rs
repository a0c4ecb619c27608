//! Rule Curation
//!
//! Field-by-field operator workflow on top of the rule store. Input and
//! output go through the [`Prompter`] seam so the workflow can be driven
//! from a terminal or a script.

mod prompt;
mod workflow;

pub use prompt::{Prompter, StdioPrompter};
pub use workflow::{Curator, MenuChoice, Outcome};

use rule_store::StoreError;
use thiserror::Error;

/// Failures that abort a curation step
#[derive(Debug, Error)]
pub enum CurationError {
    /// Reading operator input failed
    #[error("Prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
    /// Store could not persist or was unusable
    #[error(transparent)]
    Store(#[from] StoreError),
}
