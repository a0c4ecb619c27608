//! Rule Model

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Stable rule identifier of the form `R<number>`
///
/// Ids read from an external file are kept verbatim even when they do not
/// follow the `R<number>` format; such ids never take part in numbering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    /// Prefix shared by every conforming id
    pub const PREFIX: char = 'R';

    /// Wrap a raw key as found in storage
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build the conforming id for a number (`7` → `R7`)
    pub fn from_number(number: u64) -> Self {
        Self(format!("{}{}", Self::PREFIX, number))
    }

    /// Interpret operator input: surrounding whitespace dropped, upper-cased
    pub fn parse(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    /// Numeric suffix, if the id follows the `R<digits>` format
    pub fn number(&self) -> Option<u64> {
        let digits = self.0.strip_prefix(Self::PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Raw id text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Conforming ids sort numerically (R2 < R10) ahead of any malformed key.
impl Ord for RuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for RuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Treatment advice attached to a rule
///
/// A structured recommendation may omit either category, but any other key
/// is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged, from = "RecommendationRecord")]
pub enum Recommendation {
    /// Separate biological and chemical treatments
    Structured {
        #[serde(rename = "Hayati", default)]
        biological: String,
        #[serde(rename = "Kimiawi", default)]
        chemical: String,
    },
    /// Single free-text recommendation
    Flat(String),
}

impl Recommendation {
    /// Placeholder carried by diagnoses whose rule has no recommendation
    pub const UNAVAILABLE: &'static str = "No recommendation available.";

    /// Create a structured recommendation
    pub fn structured(biological: impl Into<String>, chemical: impl Into<String>) -> Self {
        Recommendation::Structured {
            biological: biological.into(),
            chemical: chemical.into(),
        }
    }

    /// Biological treatment, when structured
    pub fn biological(&self) -> Option<&str> {
        match self {
            Recommendation::Structured { biological, .. } => Some(biological),
            Recommendation::Flat(_) => None,
        }
    }

    /// Chemical treatment, when structured
    pub fn chemical(&self) -> Option<&str> {
        match self {
            Recommendation::Structured { chemical, .. } => Some(chemical),
            Recommendation::Flat(_) => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Flat(text) => f.write_str(text),
            Recommendation::Structured {
                biological,
                chemical,
            } => write!(
                f,
                "Biological: {} / Chemical: {}",
                or_na(biological),
                or_na(chemical)
            ),
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StructuredRecord {
    #[serde(rename = "Hayati", default)]
    biological: String,
    #[serde(rename = "Kimiawi", default)]
    chemical: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecommendationRecord {
    Structured(StructuredRecord),
    Flat(String),
}

impl From<RecommendationRecord> for Recommendation {
    fn from(record: RecommendationRecord) -> Self {
        match record {
            RecommendationRecord::Structured(s) => Recommendation::Structured {
                biological: s.biological,
                chemical: s.chemical,
            },
            RecommendationRecord::Flat(text) => Recommendation::Flat(text),
        }
    }
}

pub(crate) fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

/// A symptom-set-to-diagnosis rule
///
/// `certainty_factor` and `source` are only present on rules read from (or
/// written to) the query-time shape; curation-time rules leave them unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// Normalized symptom tokens (IF)
    pub conditions: Vec<String>,
    /// Diagnosis label (THEN)
    pub conclusion: String,
    /// Author's base confidence
    pub certainty_factor: Option<f64>,
    /// Provenance citation
    pub source: Option<String>,
    /// Treatment advice
    pub recommendation: Option<Recommendation>,
}

impl Rule {
    /// Create a rule with no certainty factor, source or recommendation
    pub fn new(conditions: Vec<String>, conclusion: impl Into<String>) -> Self {
        Self {
            conditions,
            conclusion: conclusion.into(),
            certainty_factor: None,
            source: None,
            recommendation: None,
        }
    }

    /// Set the certainty factor
    pub fn with_certainty(mut self, cf: f64) -> Self {
        self.certainty_factor = Some(cf);
        self
    }

    /// Set the source citation
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the recommendation
    pub fn with_recommendation(mut self, recommendation: Recommendation) -> Self {
        self.recommendation = Some(recommendation);
        self
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IF {} THEN {} (CF={:.2})",
            self.conditions.join(", "),
            self.conclusion,
            self.certainty_factor.unwrap_or(1.0)
        )
    }
}

/// Split comma-separated symptom input into normalized tokens
pub fn normalize_conditions(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}
