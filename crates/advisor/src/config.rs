//! Advisor configuration

use diagnosis_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "advisor.toml";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Advisor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Query-time rule file used for diagnosis
    pub rules_path: PathBuf,
    /// Curation-time rule file edited by the operator
    pub knowledge_base_path: PathBuf,
    /// Number of diagnoses shown
    pub top_n: usize,
    /// Scoring settings
    pub engine: EngineConfig,
    /// Maximum log level (`error` .. `trace`)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("data/rules.json"),
            knowledge_base_path: PathBuf::from("rules.json"),
            top_n: 3,
            engine: EngineConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl AdvisorConfig {
    /// Load settings layered over the defaults
    ///
    /// An explicit path must exist; the default `advisor.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let (path, required) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        config::Config::builder()
            .add_source(config::File::from(path).required(required))
            .build()?
            .try_deserialize()
    }
}
