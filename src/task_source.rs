//! Load runtime tasks from JSON or YAML documents

use adaptive_core_types::{validate_task, RuntimeTask};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A task file holds one task or an array of tasks
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskDocument {
    Many(Vec<RuntimeTask>),
    One(Box<RuntimeTask>),
}

impl TaskDocument {
    fn into_tasks(self) -> Vec<RuntimeTask> {
        match self {
            TaskDocument::Many(tasks) => tasks,
            TaskDocument::One(task) => vec![*task],
        }
    }
}

fn is_task_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

/// Parse one document; YAML unless the path ends in `.json`
pub fn parse_tasks(content: &str, path: &Path) -> Result<Vec<RuntimeTask>> {
    let document: TaskDocument = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(content)
            .with_context(|| format!("Invalid task JSON in {}", path.display()))?,
        _ => serde_yaml::from_str(content)
            .with_context(|| format!("Invalid task YAML in {}", path.display()))?,
    };
    let tasks = document.into_tasks();
    for task in &tasks {
        validate_task(task).with_context(|| format!("Rejected task in {}", path.display()))?;
    }
    Ok(tasks)
}

fn load_file(path: &Path) -> Result<Vec<RuntimeTask>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read task file {}", path.display()))?;
    let tasks = parse_tasks(&content, path)?;
    debug!(path = %path.display(), tasks = tasks.len(), "task file loaded");
    Ok(tasks)
}

/// Files to read for `path`: itself, or a directory's task files sorted by name
fn expand(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("Failed to list task directory {}", path.display()))?
    {
        let entry = entry?;
        let file = entry.path();
        if file.is_file() && is_task_file(&file) {
            files.push(file);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every task named by `paths`, in order
pub fn load_tasks(paths: &[PathBuf]) -> Result<Vec<RuntimeTask>> {
    if paths.is_empty() {
        bail!("no task files given");
    }
    let mut tasks = Vec::new();
    for path in paths {
        for file in expand(path)? {
            tasks.extend(load_file(&file)?);
        }
    }
    Ok(tasks)
}
