//! Runner configuration
//!
//! YAML file merged over built-in defaults, then `ADAPTIVE_RUNNER__SECTION__KEY`
//! environment overlays on top.

use action_flow::ExecutorConfig;
use action_gate::{GateConfig, DEFAULT_ERROR_TOAST_SELECTOR};
use action_locator::LocatorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENV_PREFIX: &str = "ADAPTIVE_RUNNER__";
const LOCAL_CONFIG: &str = "config/adaptive-runner.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub storage: StorageConfig,
    pub executor: ExecutorSection,
    pub locator: LocatorConfig,
    pub learning: LearningConfig,
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Rule store, YAML or JSON by extension
    pub rules_path: PathBuf,
    pub memory_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from(".adaptive/rules.yaml"),
            memory_path: PathBuf::from(".adaptive/memory.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSection {
    pub signal_timeout_ms: u64,
    pub capture_screenshots: bool,
    pub smart_selectors: bool,
    pub default_wait_ms: u64,
    pub error_toast_selector: String,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        let executor = ExecutorConfig::default();
        let gate = GateConfig::default();
        Self {
            signal_timeout_ms: gate.signal_timeout_ms,
            capture_screenshots: executor.capture_screenshots,
            smart_selectors: executor.smart_selectors,
            default_wait_ms: executor.default_wait_ms,
            error_toast_selector: DEFAULT_ERROR_TOAST_SELECTOR.to_string(),
        }
    }
}

impl ExecutorSection {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            capture_screenshots: self.capture_screenshots,
            smart_selectors: self.smart_selectors,
            default_wait_ms: self.default_wait_ms,
        }
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            signal_timeout_ms: self.signal_timeout_ms,
            error_toast_selector: self.error_toast_selector.clone(),
            ..GateConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Rule-synthesized retries allowed per root task
    pub max_follow_ups: u32,

    /// Report follow-up outcomes back to the rule that produced them
    pub confirm_outcomes: bool,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_follow_ups: 3,
            confirm_outcomes: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Scripted,
    Chromium,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub kind: DriverKind,

    /// Page fixture for the scripted driver
    pub fixture: Option<PathBuf>,

    pub headless: bool,
    pub base_url: Option<String>,
    pub executable: Option<PathBuf>,
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: DriverKind::Scripted,
            fixture: None,
            headless: true,
            base_url: None,
            executable: None,
            screenshot_dir: None,
        }
    }
}

pub struct LoadedConfig {
    pub config: RunnerConfig,
    /// File the config was read from, if any
    pub path: Option<PathBuf>,
}

/// Config file to read: explicit path, local project file, then user config dir
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    let mut path = dirs::config_dir()?;
    path.push("adaptive-runner");
    path.push("config.yaml");
    path.exists().then_some(path)
}

pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit);
    let mut value =
        serde_json::to_value(RunnerConfig::default()).context("Failed to encode defaults")?;

    match path.as_ref() {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let file_value: serde_yaml::Value = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            let file_value =
                serde_json::to_value(file_value).context("Config file is not JSON-compatible")?;
            merge(&mut value, file_value);
            info!(path = %path.display(), "loaded configuration");
        }
        Some(path) => {
            warn!(path = %path.display(), "config file not found, using defaults");
        }
        None => debug!("no config file, using defaults"),
    }

    apply_env_overlays(&mut value, env::vars());
    let config: RunnerConfig =
        serde_json::from_value(value).context("Invalid runner configuration")?;
    Ok(LoadedConfig { config, path })
}

/// Apply `ADAPTIVE_RUNNER__SECTION__KEY=value` pairs onto `target`
pub fn apply_env_overlays(target: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, raw) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<String> = stripped
            .split("__")
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.to_ascii_lowercase())
            .collect();
        if path.is_empty() {
            continue;
        }
        debug!(key = %key, "applying environment overlay");
        set_path(target, &path, parse_env_value(&raw));
    }
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn set_path(target: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = target;
    for segment in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        cursor = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        map.insert(last.clone(), value);
    }
}

/// Deep-merge `overlay` into `base`; objects merge, anything else replaces
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
