//! Per-component memory of alternative selectors

use crate::errors::RuleEngineError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Confidence given to freshly synthesized alternatives
pub const INITIAL_MEMORY_CONFIDENCE: f64 = 0.5;
const OUTCOME_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMemory {
    /// Alternative selectors, most preferred first
    pub strategies: Vec<String>,
    pub confidence: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemoryFile {
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    components: BTreeMap<String, ComponentMemory>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    components: DashMap<String, ComponentMemory>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the JSON store at `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RuleEngineError> {
        let path = path.into();
        let file = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.is_empty() {
                MemoryFile::default()
            } else {
                serde_json::from_slice::<MemoryFile>(&bytes)?
            }
        } else {
            MemoryFile::default()
        };

        let store = Self {
            components: file.components.into_iter().collect(),
            last_updated: RwLock::new(file.last_updated),
            path: Some(path),
        };
        debug!(components = store.components.len(), "component memory loaded");
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.read()
    }

    pub fn get(&self, component: &str) -> Option<ComponentMemory> {
        self.components.get(component).map(|entry| entry.value().clone())
    }

    /// All entries sorted by component name
    pub fn list(&self) -> Vec<(String, ComponentMemory)> {
        let mut entries: Vec<(String, ComponentMemory)> = self
            .components
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Replace a component's alternatives
    pub fn remember(
        &self,
        component: &str,
        strategies: Vec<String>,
        confidence: f64,
    ) -> Result<ComponentMemory, RuleEngineError> {
        let memory = ComponentMemory {
            strategies,
            confidence: confidence.clamp(0.0, 1.0),
            updated_at: Utc::now(),
        };
        self.components
            .insert(component.to_string(), memory.clone());
        self.persist()?;
        Ok(memory)
    }

    /// Nudge confidence after a follow-up that used remembered alternatives
    pub fn record_outcome(
        &self,
        component: &str,
        success: bool,
    ) -> Result<Option<ComponentMemory>, RuleEngineError> {
        let updated = self.components.get_mut(component).map(|mut entry| {
            let delta = if success { OUTCOME_STEP } else { -OUTCOME_STEP };
            entry.confidence = (entry.confidence + delta).clamp(0.0, 1.0);
            entry.updated_at = Utc::now();
            entry.value().clone()
        });
        if updated.is_some() {
            self.persist()?;
        }
        Ok(updated)
    }

    pub fn forget(&self, component: &str) -> Result<Option<ComponentMemory>, RuleEngineError> {
        let removed = self.components.remove(component).map(|(_, memory)| memory);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<(), RuleEngineError> {
        let now = Utc::now();
        *self.last_updated.write() = Some(now);

        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let snapshot = MemoryFile {
            last_updated: Some(now),
            components: self.list().into_iter().collect(),
        };
        let encoded = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, encoded)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_remember_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let store = MemoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        assert!(store.last_updated().is_none());

        store
            .remember("LoginForm", vec!["#a".into(), "#b".into()], 0.5)
            .unwrap();
        assert!(store.last_updated().is_some());

        let reopened = MemoryStore::open(&path).unwrap();
        let memory = reopened.get("LoginForm").unwrap();
        assert_eq!(memory.strategies, vec!["#a", "#b"]);
        assert_eq!(memory.confidence, 0.5);
        assert!(reopened.last_updated().is_some());

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["lastUpdated"].is_string());
        assert!(raw["components"]["LoginForm"]["updatedAt"].is_string());
    }

    #[test]
    fn test_record_outcome_clamps() {
        let store = MemoryStore::in_memory();
        store.remember("Cart", vec!["#x".into()], 0.95).unwrap();

        let up = store.record_outcome("Cart", true).unwrap().unwrap();
        assert_eq!(up.confidence, 1.0);

        let down = store.record_outcome("Cart", false).unwrap().unwrap();
        assert!((down.confidence - 0.9).abs() < 1e-9);

        assert!(store.record_outcome("Missing", true).unwrap().is_none());
    }

    #[test]
    fn test_forget() {
        let store = MemoryStore::in_memory();
        store.remember("Nav", vec!["nav a".into()], 0.5).unwrap();
        assert!(store.forget("Nav").unwrap().is_some());
        assert!(store.forget("Nav").unwrap().is_none());
        assert!(store.get("Nav").is_none());
    }
}
