//! Rule Collection

use crate::{Rule, RuleId, StoreError};
use std::collections::{BTreeMap, BTreeSet};

/// Rules keyed by id, iterated in ascending numeric id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleCollection {
    rules: BTreeMap<RuleId, Rule>,
}

impl RuleCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a rule by exact id
    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &RuleId) -> Option<&mut Rule> {
        self.rules.get_mut(id)
    }

    /// Whether the id is present
    pub fn contains(&self, id: &RuleId) -> bool {
        self.rules.contains_key(id)
    }

    /// Insert or replace a rule, returning the previous one
    pub fn insert(&mut self, id: RuleId, rule: Rule) -> Option<Rule> {
        self.rules.insert(id, rule)
    }

    /// Remove a rule by id
    pub fn remove(&mut self, id: &RuleId) -> Option<Rule> {
        self.rules.remove(id)
    }

    /// Iterate rules in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&RuleId, &Rule)> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if collection is empty
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Next free id: one past the highest conforming id, `R1` when none exists
    ///
    /// Keys that do not follow the `R<number>` format are ignored. Fails when
    /// the highest id is already `u64::MAX`.
    pub fn next_id(&self) -> Result<RuleId, StoreError> {
        let next = match self.rules.keys().filter_map(RuleId::number).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or_else(|| {
                StoreError::InvalidInput(format!("no rule id left after R{}", max))
            })?,
        };
        Ok(RuleId::from_number(next))
    }

    /// Sorted, de-duplicated condition tokens across every rule
    pub fn symptom_vocabulary(&self) -> Vec<String> {
        self.rules
            .values()
            .flat_map(|rule| rule.conditions.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl FromIterator<(RuleId, Rule)> for RuleCollection {
    fn from_iter<I: IntoIterator<Item = (RuleId, Rule)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RuleCollection {
    type Item = (RuleId, Rule);
    type IntoIter = std::collections::btree_map::IntoIter<RuleId, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

/// Resolve 1-based, comma-separated menu picks against a symptom vocabulary
///
/// Any token that is not an integer rejects the whole selection. Indices
/// outside the vocabulary are skipped.
pub fn select_symptoms(vocabulary: &[String], picks: &str) -> Result<Vec<String>, StoreError> {
    let indices = picks
        .split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i64>()
                .map_err(|_| StoreError::InvalidInput(format!("'{}' is not a number", token)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(indices
        .into_iter()
        .filter(|&i| i > 0 && (i as usize) <= vocabulary.len())
        .map(|i| vocabulary[i as usize - 1].clone())
        .collect())
}
