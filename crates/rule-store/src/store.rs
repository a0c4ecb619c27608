//! Rule Store Implementation

use crate::record::{decode_collection, encode_collection, RecordShape};
use crate::rule::normalize_conditions;
use crate::{Recommendation, Rule, RuleCollection, RuleId, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Fields for a new curated rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDraft {
    /// Symptom tokens
    pub conditions: Vec<String>,
    /// Diagnosis label
    pub conclusion: String,
    /// Biological treatment
    pub biological: String,
    /// Chemical treatment
    pub chemical: String,
}

impl RuleDraft {
    /// Build a draft from raw operator input
    pub fn from_input(conditions: &str, conclusion: &str, biological: &str, chemical: &str) -> Self {
        Self {
            conditions: normalize_conditions(conditions),
            conclusion: conclusion.trim().to_string(),
            biological: biological.trim().to_string(),
            chemical: chemical.trim().to_string(),
        }
    }

    /// Check that every required field has content
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.conditions.iter().all(|c| c.trim().is_empty()) {
            return Err(StoreError::ValidationFailed("conditions"));
        }
        if self.conclusion.trim().is_empty() {
            return Err(StoreError::ValidationFailed("diagnosis"));
        }
        if self.biological.trim().is_empty() {
            return Err(StoreError::ValidationFailed("biological recommendation"));
        }
        if self.chemical.trim().is_empty() {
            return Err(StoreError::ValidationFailed("chemical recommendation"));
        }
        Ok(())
    }

    fn into_rule(self) -> Rule {
        Rule::new(self.conditions, self.conclusion)
            .with_recommendation(Recommendation::structured(self.biological, self.chemical))
    }
}

/// Partial update for an existing rule; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePatch {
    pub conditions: Option<Vec<String>>,
    pub conclusion: Option<String>,
    pub biological: Option<String>,
    pub chemical: Option<String>,
}

impl RulePatch {
    /// Build a patch from raw operator input, blank answers meaning "unchanged"
    pub fn from_input(conditions: &str, conclusion: &str, biological: &str, chemical: &str) -> Self {
        let conditions = normalize_conditions(conditions);
        Self {
            conditions: (!conditions.is_empty()).then_some(conditions),
            conclusion: non_blank(conclusion),
            biological: non_blank(biological),
            chemical: non_blank(chemical),
        }
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.conditions.is_none()
            && self.conclusion.is_none()
            && self.biological.is_none()
            && self.chemical.is_none()
    }

    fn apply(self, rule: &mut Rule) {
        if let Some(conditions) = self.conditions.filter(|c| !c.is_empty()) {
            rule.conditions = conditions;
        }
        if let Some(conclusion) = self.conclusion.as_deref().and_then(non_blank) {
            rule.conclusion = conclusion;
        }

        let biological = self.biological.as_deref().and_then(non_blank);
        let chemical = self.chemical.as_deref().and_then(non_blank);
        if biological.is_none() && chemical.is_none() {
            return;
        }

        // A flat or missing recommendation is replaced by the structured form.
        let (current_bio, current_chem) = match rule.recommendation.take() {
            Some(Recommendation::Structured {
                biological,
                chemical,
            }) => (biological, chemical),
            _ => (String::new(), String::new()),
        };
        rule.recommendation = Some(Recommendation::Structured {
            biological: biological.unwrap_or(current_bio),
            chemical: chemical.unwrap_or(current_chem),
        });
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Result of a delete request
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Rule removed and collection persisted
    Removed(Rule),
    /// Caller did not confirm; nothing changed
    Cancelled,
}

/// Read a rule file according to the loading policy of its shape
///
/// A missing query-time file is [`StoreError::FileNotFound`] and a malformed
/// one is [`StoreError::FormatInvalid`]. Curation-time files recover to an
/// empty collection in both cases, the malformed case with a warning.
pub fn read_collection(path: &Path, shape: RecordShape) -> Result<RuleCollection, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return match shape {
                RecordShape::Query => Err(StoreError::FileNotFound(path.to_path_buf())),
                RecordShape::Curation => {
                    debug!("No rule file at '{}', starting empty", path.display());
                    Ok(RuleCollection::new())
                }
            };
        }
        Err(e) => return Err(e.into()),
    };

    match (decode_collection(&text, shape), shape) {
        (Ok(rules), _) => {
            info!("{} rules loaded from '{}'", rules.len(), path.display());
            Ok(rules)
        }
        (Err(StoreError::FormatInvalid(reason)), RecordShape::Curation) => {
            warn!(
                "Rule file '{}' is empty or malformed ({}); starting with a new rule base",
                path.display(),
                reason
            );
            Ok(RuleCollection::new())
        }
        (Err(e), _) => Err(e),
    }
}

fn write_collection(path: &Path, rules: &RuleCollection, shape: RecordShape) -> Result<(), StoreError> {
    let body = encode_collection(rules, shape)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    fs::write(&staging, body)?;
    if let Err(e) = fs::rename(&staging, path) {
        fs::remove_file(&staging).ok();
        return Err(e.into());
    }

    info!("Rule base saved to '{}'", path.display());
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// File-backed rule collection
///
/// Every mutation runs under the collection lock: the change is staged on a
/// copy, written to disk, and only then becomes the in-memory state.
pub struct RuleStore {
    /// Backing file
    path: PathBuf,
    /// Persisted record shape
    shape: RecordShape,
    /// Canonical in-memory collection
    rules: Mutex<RuleCollection>,
}

impl RuleStore {
    /// Open a store, loading its file with the shape's loading policy
    pub fn open(path: impl Into<PathBuf>, shape: RecordShape) -> Result<Self, StoreError> {
        let path = path.into();
        let rules = read_collection(&path, shape)?;
        Ok(Self {
            path,
            shape,
            rules: Mutex::new(rules),
        })
    }

    /// Open a curation-time store (missing or malformed file starts empty)
    pub fn open_curation(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open(path, RecordShape::Curation)
    }

    /// Open a query-time store (file must exist and parse)
    pub fn open_query(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open(path, RecordShape::Query)
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persisted record shape
    pub fn shape(&self) -> RecordShape {
        self.shape
    }

    fn lock(&self) -> Result<MutexGuard<'_, RuleCollection>, StoreError> {
        self.rules
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn commit(
        &self,
        current: &mut MutexGuard<'_, RuleCollection>,
        staged: RuleCollection,
    ) -> Result<(), StoreError> {
        write_collection(&self.path, &staged, self.shape)?;
        **current = staged;
        Ok(())
    }

    /// Reload the collection from disk, replacing the in-memory copy
    pub fn load(&self) -> Result<(), StoreError> {
        let loaded = read_collection(&self.path, self.shape)?;
        *self.lock()? = loaded;
        Ok(())
    }

    /// Write the full collection to the backing file
    pub fn save(&self) -> Result<(), StoreError> {
        let rules = self.lock()?;
        write_collection(&self.path, &rules, self.shape)
    }

    /// Read-only copy of the current collection
    pub fn snapshot(&self) -> Result<RuleCollection, StoreError> {
        Ok(self.lock()?.clone())
    }

    /// Look up a rule by exact id
    pub fn get(&self, id: &RuleId) -> Result<Option<Rule>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    /// Number of rules
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Check if store holds no rules
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Id the next added rule will receive
    pub fn next_id(&self) -> Result<RuleId, StoreError> {
        self.lock()?.next_id()
    }

    /// All rules in ascending id order
    pub fn list(&self) -> Result<Vec<(RuleId, Rule)>, StoreError> {
        Ok(self.snapshot()?.into_iter().collect())
    }

    /// Validate and insert a new rule under a fresh id, then persist
    pub fn add(&self, draft: RuleDraft) -> Result<RuleId, StoreError> {
        draft.validate()?;

        let mut rules = self.lock()?;
        let id = rules.next_id()?;
        debug!("Allocated rule id {}", id);

        let mut staged = rules.clone();
        if staged.insert(id.clone(), draft.into_rule()).is_some() {
            return Err(StoreError::InvalidInput(format!("rule {} already exists", id)));
        }
        self.commit(&mut rules, staged)?;

        info!("Rule {} added", id);
        Ok(id)
    }

    /// Apply a partial update to an existing rule, then persist
    pub fn edit(&self, id: &RuleId, patch: RulePatch) -> Result<Rule, StoreError> {
        let mut rules = self.lock()?;
        let mut staged = rules.clone();
        let rule = staged
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        if patch.is_empty() {
            debug!("Edit of {} changes no fields", id);
        }
        patch.apply(rule);
        let updated = rule.clone();

        self.commit(&mut rules, staged)?;
        info!("Rule {} updated", id);
        Ok(updated)
    }

    /// Remove a rule once the caller has confirmed, then persist
    pub fn delete(&self, id: &RuleId, confirmed: bool) -> Result<DeleteOutcome, StoreError> {
        let mut rules = self.lock()?;
        if !rules.contains(id) {
            return Err(StoreError::NotFound(id.clone()));
        }
        if !confirmed {
            info!("Deletion of {} cancelled", id);
            return Ok(DeleteOutcome::Cancelled);
        }

        let mut staged = rules.clone();
        let removed = staged
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.commit(&mut rules, staged)?;

        info!("Rule {} deleted", id);
        Ok(DeleteOutcome::Removed(removed))
    }
}
