use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleEngineError {
    #[error("failed to access store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML store: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON store: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule '{0}' not found")]
    UnknownRule(String),
    #[error("weight {0} must be within [0.25, 1.0] to re-enable a rule")]
    InvalidWeight(f64),
}
