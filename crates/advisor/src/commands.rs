//! Command Implementations

use crate::AdvisorConfig;
use anyhow::{bail, Context, Result};
use curation::{Curator, Prompter, StdioPrompter};
use diagnosis_engine::{DiagnosisEngine, DiagnosisResult};
use rule_store::{
    normalize_conditions, select_symptoms, DeleteOutcome, RuleDraft, RuleId, RulePatch, RuleStore,
    StoreError,
};
use std::io::{self, Write};
use tracing::info;

/// Symptoms for one diagnosis run
#[derive(Debug, Clone, Default)]
pub struct DiagnoseRequest {
    /// Symptom names, comma separated lists allowed
    pub symptoms: Vec<String>,
    /// 1-based picks from the numbered symptom list, e.g. `1,3,5`
    pub pick: Option<String>,
    /// Emit results as JSON instead of text
    pub json: bool,
}

fn load_engine(config: &AdvisorConfig) -> Result<DiagnosisEngine> {
    DiagnosisEngine::load(&config.rules_path, config.engine.clone())
        .with_context(|| format!("cannot load rules from '{}'", config.rules_path.display()))
}

fn open_knowledge_base(config: &AdvisorConfig) -> Result<RuleStore> {
    RuleStore::open_curation(&config.knowledge_base_path).with_context(|| {
        format!(
            "cannot open knowledge base '{}'",
            config.knowledge_base_path.display()
        )
    })
}

fn display_symptom(symptom: &str) -> String {
    symptom.replace('_', " ")
}

/// Print the numbered symptom vocabulary of the diagnosis rules
pub fn list_symptoms<W: Write>(config: &AdvisorConfig, out: &mut W) -> Result<Vec<String>> {
    let vocabulary = load_engine(config)?.symptom_vocabulary();

    writeln!(out, "Observable symptoms:")?;
    for (i, symptom) in vocabulary.iter().enumerate() {
        writeln!(out, "{}. {}", i + 1, display_symptom(symptom))?;
    }
    Ok(vocabulary)
}

/// Rank diagnoses for the requested symptoms and print the top entries
///
/// Returns the complete ranking; only `top_n` entries are printed.
pub fn diagnose<W: Write>(
    config: &AdvisorConfig,
    request: &DiagnoseRequest,
    out: &mut W,
) -> Result<Vec<DiagnosisResult>> {
    let engine = load_engine(config)?;

    let mut symptoms: Vec<String> = request
        .symptoms
        .iter()
        .flat_map(|s| normalize_conditions(s))
        .collect();
    if let Some(picks) = &request.pick {
        symptoms.extend(select_symptoms(&engine.symptom_vocabulary(), picks)?);
    }

    let results = engine.diagnose(&symptoms);
    info!("{} candidate diagnoses for {} symptoms", results.len(), symptoms.len());
    let shown = &results[..results.len().min(config.top_n)];

    if request.json {
        serde_json::to_writer_pretty(&mut *out, shown)?;
        writeln!(out)?;
        return Ok(results);
    }

    writeln!(out, "Selected symptoms:")?;
    for symptom in &symptoms {
        writeln!(out, "- {}", display_symptom(symptom))?;
    }

    writeln!(out, "\n=== Diagnosis ===")?;
    if shown.is_empty() {
        writeln!(out, "No matching diagnosis found.")?;
    }
    for result in shown {
        writeln!(out, "* {} (CF: {})", result.diagnosis, result.confidence)?;
        writeln!(out, "  Source: {}", result.source)?;
        writeln!(out, "  Recommendation: {}\n", result.recommendation)?;
    }
    Ok(results)
}

/// Print every curated rule
pub fn list_rules<W: Write>(config: &AdvisorConfig, out: &mut W) -> Result<usize> {
    let store = open_knowledge_base(config)?;
    let mut curator = Curator::new(&store, StdioPrompter::new(io::empty(), &mut *out));
    curator.view_rules()?;
    Ok(store.len()?)
}

/// Add a curated rule from command line fields
pub fn add_rule<W: Write>(config: &AdvisorConfig, draft: RuleDraft, out: &mut W) -> Result<RuleId> {
    let store = open_knowledge_base(config)?;
    let id = store.add(draft).context("rule not added")?;
    writeln!(out, "Rule {} added.", id)?;
    Ok(id)
}

/// Apply a partial update to a curated rule
pub fn edit_rule<W: Write>(
    config: &AdvisorConfig,
    id: &str,
    patch: RulePatch,
    out: &mut W,
) -> Result<()> {
    let store = open_knowledge_base(config)?;
    let id = RuleId::parse(id);
    let updated = store.edit(&id, patch)?;
    writeln!(
        out,
        "Rule {} updated: IF {} THEN {}",
        id,
        updated.conditions.join(", "),
        updated.conclusion
    )?;
    Ok(())
}

/// Delete a curated rule, asking for confirmation unless `yes` is set
pub fn delete_rule<P: Prompter>(
    config: &AdvisorConfig,
    id: &str,
    yes: bool,
    prompter: &mut P,
) -> Result<bool> {
    let store = open_knowledge_base(config)?;
    let id = RuleId::parse(id);
    if store.get(&id)?.is_none() {
        bail!(StoreError::NotFound(id));
    }

    let confirmed = yes
        || prompter
            .ask(&format!("Really delete rule {}? (y/n): ", id))?
            .trim()
            .eq_ignore_ascii_case("y");

    match store.delete(&id, confirmed)? {
        DeleteOutcome::Removed(_) => {
            prompter.say(&format!("Rule {} deleted.", id))?;
            Ok(true)
        }
        DeleteOutcome::Cancelled => {
            prompter.say("Deletion cancelled.")?;
            Ok(false)
        }
    }
}

/// Run the interactive curation menu
pub fn curate<P: Prompter>(config: &AdvisorConfig, prompter: P) -> Result<()> {
    let store = open_knowledge_base(config)?;
    Curator::new(&store, prompter).run()?;
    Ok(())
}
