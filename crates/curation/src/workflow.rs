//! Curation Workflow

use crate::{CurationError, Prompter};
use rule_store::{DeleteOutcome, Rule, RuleDraft, RuleId, RulePatch, RuleStore, StoreError};
use std::io::ErrorKind;
use tracing::{debug, info};

/// Result of one curation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New rule stored under this id
    Added(RuleId),
    /// Existing rule updated
    Updated(RuleId),
    /// Rule removed
    Deleted(RuleId),
    /// Operator backed out, or there was nothing to act on
    Cancelled,
    /// Store refused the request; the message was shown to the operator
    Rejected(String),
    /// Rules displayed
    Listed(usize),
}

/// Main menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Add,
    Edit,
    Delete,
    List,
    Quit,
}

impl MenuChoice {
    /// Parse a menu answer (`1`-`5`)
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Add),
            "2" => Some(MenuChoice::Edit),
            "3" => Some(MenuChoice::Delete),
            "4" => Some(MenuChoice::List),
            "5" => Some(MenuChoice::Quit),
            _ => None,
        }
    }
}

const MENU: &[&str] = &[
    "",
    "===== Rule Base Curation =====",
    "1. Add rule",
    "2. Edit rule",
    "3. Delete rule",
    "4. List rules",
    "5. Quit",
];

/// Drives add/edit/delete/list dialogues against a rule store
pub struct Curator<'a, P> {
    store: &'a RuleStore,
    prompter: P,
}

impl<'a, P: Prompter> Curator<'a, P> {
    /// Create a curator over a store
    pub fn new(store: &'a RuleStore, prompter: P) -> Self {
        Self { store, prompter }
    }

    /// Recover the prompter
    pub fn into_prompter(self) -> P {
        self.prompter
    }

    /// Run the menu loop until the operator quits or input ends
    pub fn run(&mut self) -> Result<(), CurationError> {
        loop {
            for line in MENU {
                self.prompter.say(line)?;
            }

            let answer = match self.prompter.ask("Choose (1-5): ") {
                Ok(answer) => answer,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e.into()),
            };

            let outcome = match MenuChoice::parse(&answer) {
                Some(MenuChoice::Add) => self.add_rule()?,
                Some(MenuChoice::Edit) => self.edit_rule()?,
                Some(MenuChoice::Delete) => self.delete_rule()?,
                Some(MenuChoice::List) => self.view_rules()?,
                Some(MenuChoice::Quit) => {
                    self.prompter.say("Exiting.")?;
                    return Ok(());
                }
                None => {
                    self.prompter.say("Invalid choice, please try again.")?;
                    continue;
                }
            };
            debug!("Curation step finished: {:?}", outcome);
        }
    }

    /// Prompt for every field of a new rule and store it
    pub fn add_rule(&mut self) -> Result<Outcome, CurationError> {
        let preview = self.store.next_id()?;
        self.prompter
            .say(&format!("\n--- New rule (id {}) ---", preview))?;

        let conditions = self.prompter.ask("Symptoms (comma separated): ")?;
        let conclusion = self.prompter.ask("Pest or disease: ")?;
        let biological = self.prompter.ask("Biological treatment: ")?;
        let chemical = self.prompter.ask("Chemical treatment: ")?;

        let draft = RuleDraft::from_input(&conditions, &conclusion, &biological, &chemical);
        match self.store.add(draft) {
            Ok(id) => {
                self.prompter.say(&format!("Rule {} added.", id))?;
                Ok(Outcome::Added(id))
            }
            Err(e) => self.reject(e),
        }
    }

    /// Show a rule's fields one by one, keeping any left blank
    pub fn edit_rule(&mut self) -> Result<Outcome, CurationError> {
        if self.view_rules()? == Outcome::Listed(0) {
            return Ok(Outcome::Cancelled);
        }

        let id = RuleId::parse(&self.prompter.ask("\nRule id to edit (e.g. R1): ")?);
        let current = match self.store.get(&id)? {
            Some(rule) => rule,
            None => return self.reject(StoreError::NotFound(id)),
        };

        self.prompter.say(&format!("\n--- Editing {} ---", id))?;
        let recommendation = current.recommendation.as_ref();

        self.prompter
            .say(&format!("Current symptoms: {}", current.conditions.join(", ")))?;
        let conditions = self.prompter.ask("New symptoms (blank keeps current): ")?;

        self.prompter
            .say(&format!("Current diagnosis: {}", current.conclusion))?;
        let conclusion = self.prompter.ask("New diagnosis (blank keeps current): ")?;

        self.prompter.say(&format!(
            "Current biological treatment: {}",
            or_na(recommendation.and_then(|r| r.biological()))
        ))?;
        let biological = self
            .prompter
            .ask("New biological treatment (blank keeps current): ")?;

        self.prompter.say(&format!(
            "Current chemical treatment: {}",
            or_na(recommendation.and_then(|r| r.chemical()))
        ))?;
        let chemical = self
            .prompter
            .ask("New chemical treatment (blank keeps current): ")?;

        let patch = RulePatch::from_input(&conditions, &conclusion, &biological, &chemical);
        match self.store.edit(&id, patch) {
            Ok(_) => {
                self.prompter.say(&format!("Rule {} updated.", id))?;
                Ok(Outcome::Updated(id))
            }
            Err(e) => self.reject(e),
        }
    }

    /// Ask for an id and an explicit `y` before removing the rule
    pub fn delete_rule(&mut self) -> Result<Outcome, CurationError> {
        if self.view_rules()? == Outcome::Listed(0) {
            return Ok(Outcome::Cancelled);
        }

        let id = RuleId::parse(&self.prompter.ask("\nRule id to delete (e.g. R1): ")?);
        if self.store.get(&id)?.is_none() {
            return self.reject(StoreError::NotFound(id));
        }

        let answer = self
            .prompter
            .ask(&format!("Really delete rule {}? (y/n): ", id))?;
        let confirmed = answer.trim().eq_ignore_ascii_case("y");

        match self.store.delete(&id, confirmed) {
            Ok(DeleteOutcome::Removed(_)) => {
                self.prompter.say(&format!("Rule {} deleted.", id))?;
                Ok(Outcome::Deleted(id))
            }
            Ok(DeleteOutcome::Cancelled) => {
                self.prompter.say("Deletion cancelled.")?;
                Ok(Outcome::Cancelled)
            }
            Err(e) => self.reject(e),
        }
    }

    /// Print every rule in ascending id order
    pub fn view_rules(&mut self) -> Result<Outcome, CurationError> {
        let rules = self.store.list()?;

        self.prompter.say("\n--- Rules in the knowledge base ---")?;
        if rules.is_empty() {
            self.prompter.say("The knowledge base is empty.")?;
            return Ok(Outcome::Listed(0));
        }

        for (id, rule) in &rules {
            for line in describe(id, rule) {
                self.prompter.say(&line)?;
            }
        }
        self.prompter.say("-----------------------------------")?;
        Ok(Outcome::Listed(rules.len()))
    }

    /// Show validation and lookup failures verbatim; anything else aborts
    fn reject(&mut self, err: StoreError) -> Result<Outcome, CurationError> {
        match err {
            StoreError::ValidationFailed(_) | StoreError::NotFound(_) => {
                info!("Curation request rejected: {}", err);
                self.prompter.say(&format!("[Error] {}", err))?;
                Ok(Outcome::Rejected(err.to_string()))
            }
            other => Err(other.into()),
        }
    }
}

fn or_na(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "N/A",
    }
}

fn describe(id: &RuleId, rule: &Rule) -> Vec<String> {
    let recommendation = rule.recommendation.as_ref();
    let mut lines = vec![
        format!("\nRule ID: {}", id),
        format!("  IF: {}", rule.conditions.join(", ")),
        format!("  THEN: {}", rule.conclusion),
    ];
    match recommendation {
        Some(rec) if rec.biological().is_none() => {
            lines.push(format!("  Recommendation: {}", rec));
        }
        _ => {
            lines.push(format!(
                "  Biological treatment: {}",
                or_na(recommendation.and_then(|r| r.biological()))
            ));
            lines.push(format!(
                "  Chemical treatment: {}",
                or_na(recommendation.and_then(|r| r.chemical()))
            ));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use rule_store::Recommendation;
    use std::collections::VecDeque;
    use std::io;
    use tempfile::{tempdir, TempDir};

    /// Answers queued up front; every line shown is recorded
    #[derive(Default)]
    struct ScriptedPrompter {
        answers: VecDeque<String>,
        transcript: Vec<String>,
    }

    impl ScriptedPrompter {
        fn with_answers(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                transcript: Vec::new(),
            }
        }

        fn saw(&self, needle: &str) -> bool {
            self.transcript.iter().any(|line| line.contains(needle))
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask(&mut self, question: &str) -> io::Result<String> {
            self.transcript.push(question.to_string());
            self.answers
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }

        fn say(&mut self, line: &str) -> io::Result<()> {
            self.transcript.push(line.to_string());
            Ok(())
        }
    }

    fn store() -> (TempDir, RuleStore) {
        let dir = tempdir().unwrap();
        let store = RuleStore::open_curation(dir.path().join("rules.json")).unwrap();
        (dir, store)
    }

    fn seed(store: &RuleStore) {
        store
            .add(RuleDraft::from_input("wilting, yellowing", "Blight", "Bacillus", "Copper"))
            .unwrap();
        store
            .add(RuleDraft::from_input("brown_spots", "Blast", "Trichoderma", "Tricyclazole"))
            .unwrap();
    }

    #[test]
    fn test_add_rule() {
        let (_dir, store) = store();
        let prompter =
            ScriptedPrompter::with_answers(&["Wilting, Stunting", "Tungro", "Remove hosts", "Imidacloprid"]);
        let mut curator = Curator::new(&store, prompter);

        assert_eq!(curator.add_rule().unwrap(), Outcome::Added(RuleId::new("R1")));

        let rule = store.get(&RuleId::new("R1")).unwrap().unwrap();
        assert_eq!(rule.conditions, vec!["wilting".to_string(), "stunting".to_string()]);
        assert!(curator.into_prompter().saw("Rule R1 added."));
    }

    #[test]
    fn test_add_rule_with_missing_field_is_rejected() {
        let (_dir, store) = store();
        let prompter = ScriptedPrompter::with_answers(&["wilting", "Blight", "", "Copper"]);
        let mut curator = Curator::new(&store, prompter);

        let outcome = curator.add_rule().unwrap();
        assert!(matches!(outcome, Outcome::Rejected(_)));
        assert!(store.is_empty().unwrap());
        assert!(!store.path().exists());
        assert!(curator.into_prompter().saw("[Error]"));
    }

    #[test]
    fn test_edit_rule_keeps_blank_fields() {
        let (_dir, store) = store();
        seed(&store);
        let prompter = ScriptedPrompter::with_answers(&["r2", "", "Leaf blast", "", ""]);
        let mut curator = Curator::new(&store, prompter);

        assert_eq!(curator.edit_rule().unwrap(), Outcome::Updated(RuleId::new("R2")));

        let rule = store.get(&RuleId::new("R2")).unwrap().unwrap();
        assert_eq!(rule.conclusion, "Leaf blast");
        assert_eq!(rule.conditions, vec!["brown_spots".to_string()]);
        assert_eq!(
            rule.recommendation,
            Some(Recommendation::structured("Trichoderma", "Tricyclazole"))
        );
    }

    #[test]
    fn test_edit_unknown_id() {
        let (_dir, store) = store();
        seed(&store);
        let prompter = ScriptedPrompter::with_answers(&["R7"]);
        let mut curator = Curator::new(&store, prompter);

        assert_eq!(
            curator.edit_rule().unwrap(),
            Outcome::Rejected("Rule R7 not found".to_string())
        );
    }

    #[test]
    fn test_edit_on_empty_store() {
        let (_dir, store) = store();
        let mut curator = Curator::new(&store, ScriptedPrompter::default());
        assert_eq!(curator.edit_rule().unwrap(), Outcome::Cancelled);
        assert!(curator.into_prompter().saw("The knowledge base is empty."));
    }

    #[test]
    fn test_delete_requires_y() {
        let (_dir, store) = store();
        seed(&store);

        let mut curator = Curator::new(&store, ScriptedPrompter::with_answers(&["R1", "n"]));
        assert_eq!(curator.delete_rule().unwrap(), Outcome::Cancelled);
        assert_eq!(store.len().unwrap(), 2);

        let mut curator = Curator::new(&store, ScriptedPrompter::with_answers(&["R1", "Y"]));
        assert_eq!(curator.delete_rule().unwrap(), Outcome::Deleted(RuleId::new("R1")));
        assert!(store.get(&RuleId::new("R1")).unwrap().is_none());
        assert!(store.get(&RuleId::new("R2")).unwrap().is_some());
    }

    #[test]
    fn test_view_rules_lists_in_id_order() {
        let (_dir, store) = store();
        seed(&store);
        let mut curator = Curator::new(&store, ScriptedPrompter::default());

        assert_eq!(curator.view_rules().unwrap(), Outcome::Listed(2));
        let transcript = curator.into_prompter().transcript;
        let r1 = transcript.iter().position(|l| l.contains("Rule ID: R1")).unwrap();
        let r2 = transcript.iter().position(|l| l.contains("Rule ID: R2")).unwrap();
        assert!(r1 < r2);
        assert!(transcript.iter().any(|l| l == "  Biological treatment: Bacillus"));
    }

    #[test]
    fn test_menu_loop() {
        let (_dir, store) = store();
        let prompter = ScriptedPrompter::with_answers(&[
            "9",
            "1",
            "wilting",
            "Blight",
            "Bacillus",
            "Copper",
            "4",
            "5",
        ]);
        let mut curator = Curator::new(&store, prompter);
        curator.run().unwrap();

        assert_eq!(store.len().unwrap(), 1);
        let prompter = curator.into_prompter();
        assert!(prompter.saw("Invalid choice, please try again."));
        assert!(prompter.saw("Exiting."));
    }

    #[test]
    fn test_menu_loop_ends_on_eof() {
        let (_dir, store) = store();
        let mut curator = Curator::new(&store, ScriptedPrompter::default());
        assert!(curator.run().is_ok());
    }

    #[test]
    fn test_menu_choice_parse() {
        assert_eq!(MenuChoice::parse(" 3 "), Some(MenuChoice::Delete));
        assert_eq!(MenuChoice::parse("six"), None);
    }
}
