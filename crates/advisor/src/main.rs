//! Pest and Disease Advisor - Main Entry Point

use advisor::{
    add_rule, curate, delete_rule, diagnose, edit_rule, init_logging, list_rules, list_symptoms,
    AdvisorConfig, DiagnoseRequest,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curation::StdioPrompter;
use rule_store::{RuleDraft, RulePatch};
use std::io;
use std::path::PathBuf;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "advisor", version, about = "Rule-based pest and disease advisor")]
struct Cli {
    /// Config file (defaults to ./advisor.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum log level
    #[arg(long, global = true)]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the symptoms known to the diagnosis rules
    Symptoms {
        /// Query-time rule file
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Rank diagnoses for observed symptoms
    Diagnose {
        /// Query-time rule file
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Observed symptom (repeatable, comma separated lists allowed)
        #[arg(short, long = "symptom")]
        symptoms: Vec<String>,
        /// Numbers from the `symptoms` listing, e.g. 1,3,5
        #[arg(long)]
        pick: Option<String>,
        /// Number of diagnoses to show
        #[arg(long)]
        top: Option<usize>,
        /// Minimum fraction of a rule's symptoms that must be observed
        #[arg(long)]
        min_ratio: Option<f64>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List curated rules
    Rules {
        /// Curation-time rule file
        #[arg(long)]
        kb: Option<PathBuf>,
    },

    /// Add a curated rule
    Add {
        #[arg(long)]
        kb: Option<PathBuf>,
        /// Comma separated symptoms
        #[arg(long)]
        symptoms: String,
        #[arg(long)]
        diagnosis: String,
        #[arg(long)]
        biological: String,
        #[arg(long)]
        chemical: String,
    },

    /// Edit a curated rule; omitted fields keep their value
    Edit {
        /// Rule id, e.g. R3
        id: String,
        #[arg(long)]
        kb: Option<PathBuf>,
        #[arg(long, default_value = "")]
        symptoms: String,
        #[arg(long, default_value = "")]
        diagnosis: String,
        #[arg(long, default_value = "")]
        biological: String,
        #[arg(long, default_value = "")]
        chemical: String,
    },

    /// Delete a curated rule
    Delete {
        /// Rule id, e.g. R3
        id: String,
        #[arg(long)]
        kb: Option<PathBuf>,
        /// Skip the confirmation question
        #[arg(long)]
        yes: bool,
    },

    /// Interactive curation menu
    Curate {
        #[arg(long)]
        kb: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AdvisorConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let level = match cli.log_level {
        Some(level) => level,
        None => config
            .log_level
            .parse()
            .with_context(|| format!("invalid log_level '{}'", config.log_level))?,
    };
    init_logging(level, config.log_format);
    debug!("Configuration: {:?}", config);

    let mut out = io::stdout().lock();
    match cli.command {
        Commands::Symptoms { rules } => {
            let config = with_rules(config, rules);
            list_symptoms(&config, &mut out)?;
        }
        Commands::Diagnose {
            rules,
            symptoms,
            pick,
            top,
            min_ratio,
            json,
        } => {
            let mut config = with_rules(config, rules);
            if let Some(top) = top {
                config.top_n = top;
            }
            if let Some(min_ratio) = min_ratio {
                config.engine.min_match_ratio = min_ratio;
            }
            let request = DiagnoseRequest {
                symptoms,
                pick,
                json,
            };
            diagnose(&config, &request, &mut out)?;
        }
        Commands::Rules { kb } => {
            list_rules(&with_kb(config, kb), &mut out)?;
        }
        Commands::Add {
            kb,
            symptoms,
            diagnosis,
            biological,
            chemical,
        } => {
            let draft = RuleDraft::from_input(&symptoms, &diagnosis, &biological, &chemical);
            add_rule(&with_kb(config, kb), draft, &mut out)?;
        }
        Commands::Edit {
            id,
            kb,
            symptoms,
            diagnosis,
            biological,
            chemical,
        } => {
            let patch = RulePatch::from_input(&symptoms, &diagnosis, &biological, &chemical);
            edit_rule(&with_kb(config, kb), &id, patch, &mut out)?;
        }
        Commands::Delete { id, kb, yes } => {
            drop(out);
            delete_rule(&with_kb(config, kb), &id, yes, &mut StdioPrompter::stdio())?;
        }
        Commands::Curate { kb } => {
            drop(out);
            curate(&with_kb(config, kb), StdioPrompter::stdio())?;
        }
    }

    Ok(())
}

fn with_rules(mut config: AdvisorConfig, rules: Option<PathBuf>) -> AdvisorConfig {
    if let Some(rules) = rules {
        config.rules_path = rules;
    }
    config
}

fn with_kb(mut config: AdvisorConfig, kb: Option<PathBuf>) -> AdvisorConfig {
    if let Some(kb) = kb {
        config.knowledge_base_path = kb;
    }
    config
}
