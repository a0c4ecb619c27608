//! Diagnosis Engine Implementation

use crate::{EngineConfig, EngineError};
use rule_store::{Recommendation, Rule, RuleCollection, RuleId, RuleStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Certainty factor assumed for rules that do not state one
const DEFAULT_CERTAINTY: f64 = 1.0;

/// One candidate diagnosis for a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    /// Rule that produced the diagnosis
    #[serde(rename = "Rule_ID")]
    pub rule_id: RuleId,
    /// Diagnosis label
    #[serde(rename = "Diagnosis")]
    pub diagnosis: String,
    /// Certainty factor scaled by match ratio, rounded
    #[serde(rename = "CF_Computed")]
    pub confidence: f64,
    /// Provenance of the rule
    #[serde(rename = "Sumber")]
    pub source: String,
    /// Treatment advice
    #[serde(rename = "Rekomendasi")]
    pub recommendation: Recommendation,
}

/// Rule-matching diagnosis engine over a read-only rule collection
pub struct DiagnosisEngine {
    /// Query-time rules
    rules: RuleCollection,
    /// Scoring configuration
    config: EngineConfig,
}

impl DiagnosisEngine {
    /// Create an engine over an already loaded collection
    pub fn new(rules: RuleCollection, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { rules, config })
    }

    /// Load the mandatory query-time rule file
    pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self, EngineError> {
        let path = path.as_ref();
        info!("Creating diagnosis engine with rules: {}", path.display());
        let store = RuleStore::open_query(path)?;
        Self::new(store.snapshot()?, config)
    }

    /// Rank every rule against the observed symptoms
    pub fn diagnose<S: AsRef<str>>(&self, symptoms: &[S]) -> Vec<DiagnosisResult> {
        let results = rank(&self.rules, symptoms, &self.config);
        debug!(
            "Diagnosis over {} symptoms produced {} candidates",
            symptoms.len(),
            results.len()
        );
        results
    }

    /// Rules the engine scores against
    pub fn rules(&self) -> &RuleCollection {
        &self.rules
    }

    /// Every symptom known to the rule base, sorted
    pub fn symptom_vocabulary(&self) -> Vec<String> {
        self.rules.symptom_vocabulary()
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Score and rank `rules` against `symptoms`
///
/// Rules with no observed condition (or no conditions at all) are dropped.
/// Ties keep ascending rule id order.
pub fn rank<S: AsRef<str>>(
    rules: &RuleCollection,
    symptoms: &[S],
    config: &EngineConfig,
) -> Vec<DiagnosisResult> {
    let observed: HashSet<&str> = symptoms.iter().map(|s| s.as_ref()).collect();

    let mut results: Vec<DiagnosisResult> = rules
        .iter()
        .filter_map(|(id, rule)| score(id, rule, &observed, config))
        .collect();

    // Stable sort keeps id order among equal confidences.
    results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    results
}

fn score(
    id: &RuleId,
    rule: &Rule,
    observed: &HashSet<&str>,
    config: &EngineConfig,
) -> Option<DiagnosisResult> {
    let conditions: HashSet<&str> = rule.conditions.iter().map(String::as_str).collect();
    if conditions.is_empty() {
        return None;
    }

    let matched = conditions.intersection(observed).count();
    let match_ratio = matched as f64 / conditions.len() as f64;
    if match_ratio == 0.0 || match_ratio < config.min_match_ratio {
        return None;
    }

    let certainty = rule.certainty_factor.unwrap_or(DEFAULT_CERTAINTY);
    Some(DiagnosisResult {
        rule_id: id.clone(),
        diagnosis: rule.conclusion.clone(),
        confidence: round_to(certainty * match_ratio, config.decimals),
        source: rule.source.clone().unwrap_or_default(),
        recommendation: rule
            .recommendation
            .clone()
            .unwrap_or_else(|| Recommendation::Flat(Recommendation::UNAVAILABLE.to_string())),
    })
}

/// Round to `decimals` places, ties to even on the exact binary value
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    // Exact error of the product; non-zero means `scaled` is not the true value.
    let residual = value.mul_add(scale, -scaled);

    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 && residual != 0.0 {
        if residual > 0.0 {
            scaled.ceil()
        } else {
            scaled.floor()
        }
    } else {
        scaled.round_ties_even()
    };
    rounded / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(conditions: &[&str], conclusion: &str, cf: f64) -> Rule {
        Rule::new(conditions.iter().map(|s| s.to_string()).collect(), conclusion)
            .with_certainty(cf)
            .with_source("Rice pest handbook")
    }

    fn scenario() -> RuleCollection {
        vec![
            (RuleId::new("R1"), rule(&["brown_spots", "wilting"], "Blast", 0.8)),
            (RuleId::new("R2"), rule(&["wilting"], "Blight", 0.6)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_partial_match_ranking() {
        let engine = DiagnosisEngine::new(scenario(), EngineConfig::default()).unwrap();
        let results = engine.diagnose(&["wilting"]);

        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.rule_id.as_str(), r.diagnosis.as_str(), r.confidence))
            .collect();
        assert_eq!(summary, vec![("R2", "Blight", 0.6), ("R1", "Blast", 0.4)]);
    }

    #[test]
    fn test_no_overlap_excluded() {
        let engine = DiagnosisEngine::new(scenario(), EngineConfig::default()).unwrap();
        assert!(engine.diagnose(&["yellow_leaves"]).is_empty());
        assert!(engine.diagnose::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_rule_without_conditions_is_skipped() {
        let rules: RuleCollection =
            std::iter::once((RuleId::new("R1"), rule(&[], "Nothing", 0.9))).collect();
        assert!(rank(&rules, &["wilting"], &EngineConfig::default()).is_empty());
    }

    #[test]
    fn test_duplicate_conditions_count_once() {
        let rules: RuleCollection = std::iter::once((
            RuleId::new("R1"),
            rule(&["wilting", "wilting", "stunting"], "Tungro", 0.9),
        ))
        .collect();
        let results = rank(&rules, &["wilting"], &EngineConfig::default());
        assert_eq!(results[0].confidence, 0.45);
    }

    #[test]
    fn test_half_way_confidence_rounds_to_even() {
        let rules: RuleCollection = vec![
            (RuleId::new("R1"), rule(&["a", "x"], "Quarter", 0.25)),
            (RuleId::new("R2"), rule(&["a", "x"], "Five eighths", 0.625)),
            (RuleId::new("R3"), rule(&["a", "x"], "Three quarters", 0.75)),
        ]
        .into_iter()
        .collect();

        let confidences: Vec<_> = rank(&rules, &["a"], &EngineConfig::default())
            .into_iter()
            .map(|r| (r.rule_id.to_string(), r.confidence))
            .collect();
        assert_eq!(
            confidences,
            vec![
                ("R3".to_string(), 0.38),
                ("R2".to_string(), 0.31),
                ("R1".to_string(), 0.12),
            ]
        );
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.135, 2), 0.14);
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(1.005, 2), 1.0);
        assert_eq!(round_to(0.4, 2), 0.4);
        assert_eq!(round_to(0.3125, 3), 0.312);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn test_min_match_ratio_threshold() {
        let results = rank(&scenario(), &["wilting"], &EngineConfig::strict());
        assert_eq!(results.len(), 2);

        let config = EngineConfig {
            min_match_ratio: 0.75,
            ..Default::default()
        };
        let results = rank(&scenario(), &["wilting"], &config);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_id, RuleId::new("R2"));
    }

    #[test]
    fn test_ties_keep_id_order() {
        let rules: RuleCollection = vec![
            (RuleId::new("R10"), rule(&["wilting"], "C", 0.5)),
            (RuleId::new("R2"), rule(&["wilting"], "B", 0.5)),
            (RuleId::new("R1"), rule(&["wilting"], "A", 0.5)),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = rank(&rules, &["wilting"], &EngineConfig::default())
            .into_iter()
            .map(|r| r.rule_id.to_string())
            .collect();
        assert_eq!(ids, vec!["R1", "R2", "R10"]);
    }

    #[test]
    fn test_missing_recommendation_placeholder() {
        let results = rank(&scenario(), &["wilting"], &EngineConfig::default());
        assert_eq!(
            results[0].recommendation,
            Recommendation::Flat(Recommendation::UNAVAILABLE.to_string())
        );
        assert_eq!(results[0].source, "Rice pest handbook");
    }

    #[test]
    fn test_result_wire_names() {
        let results = rank(&scenario(), &["wilting"], &EngineConfig::default());
        let json = serde_json::to_value(&results[0]).unwrap();
        assert_eq!(json["Rule_ID"], "R2");
        assert_eq!(json["Diagnosis"], "Blight");
        assert_eq!(json["CF_Computed"], 0.6);
        assert_eq!(json["Sumber"], "Rice pest handbook");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DiagnosisEngine::load(dir.path().join("rules.json"), EngineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            EngineError::RuleBase(rule_store::StoreError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"R1": {"IF": ["wilting"], "THEN": "Blight", "CF": 0.7, "Sumber": "Lab note",
                      "Rekomendasi": {"Hayati": "Bacillus", "Kimiawi": "Copper"}}}"#,
        )
        .unwrap();

        let engine = DiagnosisEngine::load(&path, EngineConfig::default()).unwrap();
        let results = engine.diagnose(&["wilting"]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 0.7);
        assert_eq!(results[0].recommendation.chemical(), Some("Copper"));
    }

    fn arb_rules() -> impl Strategy<Value = RuleCollection> {
        let symptom = prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]);
        let rule = (prop::collection::vec(symptom, 1..5), 0.01f64..=1.0);
        prop::collection::vec(rule, 0..12).prop_map(|rules| {
            rules
                .into_iter()
                .enumerate()
                .map(|(i, (conditions, cf))| {
                    (
                        RuleId::from_number(i as u64 + 1),
                        Rule::new(conditions.into_iter().map(String::from).collect(), "X")
                            .with_certainty(cf)
                            .with_source("s"),
                    )
                })
                .collect()
        })
    }

    fn arb_symptoms() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop::sample::select(vec!["a", "b", "c", "d", "e", "f", "z"]).prop_map(String::from),
            0..6,
        )
    }

    proptest! {
        #[test]
        fn prop_sorted_non_increasing(rules in arb_rules(), symptoms in arb_symptoms()) {
            let results = rank(&rules, &symptoms, &EngineConfig::default());
            for pair in results.windows(2) {
                prop_assert!(pair[0].confidence >= pair[1].confidence);
            }
        }

        #[test]
        fn prop_disjoint_rules_absent(rules in arb_rules(), symptoms in arb_symptoms()) {
            let results = rank(&rules, &symptoms, &EngineConfig::default());
            for (id, rule) in rules.iter() {
                let disjoint = rule.conditions.iter().all(|c| !symptoms.contains(c));
                if disjoint {
                    prop_assert!(results.iter().all(|r| &r.rule_id != id));
                }
            }
        }

        #[test]
        fn prop_full_match_keeps_certainty(rules in arb_rules(), symptoms in arb_symptoms()) {
            let results = rank(&rules, &symptoms, &EngineConfig::default());
            for (id, rule) in rules.iter() {
                if rule.conditions.iter().all(|c| symptoms.contains(c)) {
                    let result = results.iter().find(|r| &r.rule_id == id).unwrap();
                    let cf = rule.certainty_factor.unwrap();
                    prop_assert_eq!(result.confidence, round_to(cf, 2));
                }
            }
        }
    }
}
