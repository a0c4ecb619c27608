//! On-disk Record Shapes
//!
//! The same rule is persisted in one of two JSON shapes:
//!
//! - curation: `{"IF": [..], "THEN": "..", "REKOMENDASI": {"Hayati": "..", "Kimiawi": ".."}}`
//! - query: `{"IF": [..], "THEN": "..", "CF": 0.8, "Sumber": "..", "Rekomendasi": ".." | {..}}`
//!
//! Both map onto the single [`Rule`] type.

use crate::{Recommendation, Rule, RuleCollection, RuleId, StoreError};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Which persisted record shape a file uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordShape {
    /// Rules authored through curation; missing or malformed files recover empty
    Curation,
    /// Rules consumed by diagnosis; the file is mandatory and must parse
    Query,
}

#[derive(Debug, Serialize, Deserialize)]
struct CurationRecord {
    #[serde(rename = "IF")]
    conditions: Vec<String>,
    #[serde(rename = "THEN")]
    conclusion: String,
    #[serde(rename = "CF", default, skip_serializing_if = "Option::is_none")]
    certainty_factor: Option<f64>,
    #[serde(rename = "Sumber", default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(
        rename = "REKOMENDASI",
        alias = "Rekomendasi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    recommendation: Option<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryRecord {
    #[serde(rename = "IF")]
    conditions: Vec<String>,
    #[serde(rename = "THEN")]
    conclusion: String,
    #[serde(rename = "CF")]
    certainty_factor: f64,
    #[serde(rename = "Sumber")]
    source: String,
    #[serde(
        rename = "Rekomendasi",
        alias = "REKOMENDASI",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    recommendation: Option<Recommendation>,
}

impl From<CurationRecord> for Rule {
    fn from(record: CurationRecord) -> Self {
        Rule {
            conditions: record.conditions,
            conclusion: record.conclusion,
            certainty_factor: record.certainty_factor,
            source: record.source,
            recommendation: record.recommendation,
        }
    }
}

impl From<QueryRecord> for Rule {
    fn from(record: QueryRecord) -> Self {
        Rule {
            conditions: record.conditions,
            conclusion: record.conclusion,
            certainty_factor: Some(record.certainty_factor),
            source: Some(record.source),
            recommendation: record.recommendation,
        }
    }
}

impl From<&Rule> for CurationRecord {
    fn from(rule: &Rule) -> Self {
        CurationRecord {
            conditions: rule.conditions.clone(),
            conclusion: rule.conclusion.clone(),
            certainty_factor: rule.certainty_factor,
            source: rule.source.clone(),
            recommendation: rule.recommendation.clone(),
        }
    }
}

impl QueryRecord {
    fn try_from_rule(id: &RuleId, rule: &Rule) -> Result<Self, StoreError> {
        let certainty_factor = rule.certainty_factor.ok_or_else(|| {
            StoreError::FormatInvalid(format!("rule {} has no certainty factor", id))
        })?;
        let source = rule
            .source
            .clone()
            .ok_or_else(|| StoreError::FormatInvalid(format!("rule {} has no source", id)))?;

        Ok(QueryRecord {
            conditions: rule.conditions.clone(),
            conclusion: rule.conclusion.clone(),
            certainty_factor,
            source,
            recommendation: rule.recommendation.clone(),
        })
    }
}

/// Parse a rule file body in the given shape
pub fn decode_collection(text: &str, shape: RecordShape) -> Result<RuleCollection, StoreError> {
    let entries: Map<String, Value> = serde_json::from_str(text)?;

    entries
        .into_iter()
        .map(|(key, value)| -> Result<(RuleId, Rule), StoreError> {
            let rule = match shape {
                RecordShape::Curation => serde_json::from_value::<CurationRecord>(value).map(Rule::from),
                RecordShape::Query => serde_json::from_value::<QueryRecord>(value).map(Rule::from),
            }
            .map_err(|e| StoreError::FormatInvalid(format!("rule {}: {}", key, e)))?;
            Ok((RuleId::new(key), rule))
        })
        .collect()
}

/// Render a collection as pretty JSON in the given shape, keys in id order
pub fn encode_collection(rules: &RuleCollection, shape: RecordShape) -> Result<String, StoreError> {
    let records = rules
        .iter()
        .map(|(id, rule)| -> Result<_, StoreError> {
            let record = match shape {
                RecordShape::Curation => ShapedRecord::Curation(CurationRecord::from(rule)),
                RecordShape::Query => ShapedRecord::Query(QueryRecord::try_from_rule(id, rule)?),
            };
            Ok((id, record))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = serde_json::to_string_pretty(&OrderedRecords(records))?;
    out.push('\n');
    Ok(out)
}

#[derive(Serialize)]
#[serde(untagged)]
enum ShapedRecord {
    Curation(CurationRecord),
    Query(QueryRecord),
}

// serde_json's Map sorts keys lexically; this keeps ascending id order.
struct OrderedRecords<'a>(Vec<(&'a RuleId, ShapedRecord)>);

impl Serialize for OrderedRecords<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, record)| (id.as_str(), record)))
    }
}
