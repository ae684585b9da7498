use thiserror::Error;

/// Errors raised while loading or validating runtime tasks
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    /// Task failed structural validation
    #[error("invalid task '{task_id}': {reason}")]
    Invalid { task_id: String, reason: String },

    /// Task document could not be parsed
    #[error("failed to parse task: {0}")]
    Parse(String),
}

impl TaskError {
    pub fn invalid(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }
}
