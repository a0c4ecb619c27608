//! Pest and Disease Advisor
//!
//! Thin front end over the rule store, diagnosis engine and curation
//! workflow: configuration, logging and the command implementations.

mod commands;
mod config;

pub use commands::{
    add_rule, curate, delete_rule, diagnose, edit_rule, list_rules, list_symptoms, DiagnoseRequest,
};
pub use config::{AdvisorConfig, LogFormat, DEFAULT_CONFIG_FILE};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging on stderr, keeping stdout for command output
pub fn init_logging(level: Level, format: LogFormat) {
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    result.expect("Failed to set tracing subscriber");
}
