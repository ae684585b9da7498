//! Durable rule store
//!
//! The whole rule list is read at open and written back in full after every
//! mutation. `.yaml`/`.yml` paths use YAML, anything else JSON.

use crate::errors::RuleEngineError;
use crate::rule::{default_rules, Rule};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct RuleFile {
    rules: Vec<Rule>,
}

#[derive(Debug)]
pub struct RuleStore {
    rules: RwLock<Vec<Rule>>,
    path: Option<PathBuf>,
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl RuleStore {
    /// Store without a backing file
    pub fn in_memory(rules: Vec<Rule>) -> Self {
        Self {
            rules: RwLock::new(rules),
            path: None,
        }
    }

    /// Open the store at `path`, falling back to the built-in rules when the
    /// file does not exist yet.
    ///
    /// Ineffective rules (weight below the minimum) are disabled and the
    /// change is written back immediately.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleEngineError> {
        let path = path.into();
        let mut rules = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else if is_yaml(&path) {
                serde_yaml::from_str::<RuleFile>(&raw)?.rules
            } else {
                serde_json::from_str::<RuleFile>(&raw)?.rules
            }
        } else {
            debug!(path = %path.display(), "rule store missing, using built-in rules");
            default_rules()
        };

        let mut disabled = 0;
        for rule in rules.iter_mut().filter(|r| r.enabled && !r.is_effective()) {
            warn!(rule_id = %rule.id, weight = rule.weight, "disabling ineffective rule");
            rule.enabled = false;
            disabled += 1;
        }

        let store = Self {
            rules: RwLock::new(rules),
            path: Some(path),
        };
        if disabled > 0 {
            store.persist()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot in declaration order
    pub fn rules(&self) -> Vec<Rule> {
        self.rules.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Rule> {
        self.rules.read().iter().find(|rule| rule.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Rules matching `predicate`, in declaration order
    pub fn filter(&self, predicate: impl Fn(&Rule) -> bool) -> Vec<Rule> {
        self.rules
            .read()
            .iter()
            .filter(|rule| predicate(rule))
            .cloned()
            .collect()
    }

    /// Mutate one rule under the write lock, stamp it and persist
    pub fn update<R>(
        &self,
        id: &str,
        mutate: impl FnOnce(&mut Rule) -> R,
    ) -> Result<R, RuleEngineError> {
        let result = {
            let mut guard = self.rules.write();
            let rule = guard
                .iter_mut()
                .find(|rule| rule.id == id)
                .ok_or_else(|| RuleEngineError::UnknownRule(id.to_string()))?;
            rule.metadata.last_updated = Some(Utc::now());
            mutate(rule)
        };
        self.persist()?;
        Ok(result)
    }

    fn persist(&self) -> Result<(), RuleEngineError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let snapshot = RuleFile {
            rules: self.rules(),
        };
        let encoded = if is_yaml(path) {
            serde_yaml::to_string(&snapshot)?
        } else {
            serde_json::to_string_pretty(&snapshot)?
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, encoded)?;
        Ok(())
    }
}
