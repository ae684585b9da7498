use anyhow::{bail, Context, Result};
use browser_driver::{PageFixture, ScriptedDriver, SharedDriver};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::context::CliContext;
use super::output::print_json;
use crate::config::{DriverConfig, DriverKind, RunnerConfig};
use crate::runner::{AdaptiveRunner, RunReport};
use crate::task_source::load_tasks;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Task files or directories of task files
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Page fixture for the scripted driver (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Browser driver backend
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,

    /// Rule-synthesized retries allowed per task
    #[arg(long)]
    pub max_follow_ups: Option<u32>,

    /// Also write the run report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let mut config: RunnerConfig = ctx.config().clone();
    if let Some(kind) = args.driver {
        config.driver.kind = kind;
    }
    if let Some(fixture) = args.fixture.clone() {
        config.driver.fixture = Some(fixture);
    }
    if let Some(max) = args.max_follow_ups {
        config.learning.max_follow_ups = max;
    }

    let tasks = load_tasks(&args.paths)?;
    info!(
        tasks = tasks.len(),
        config = ?ctx.config_path(),
        driver = ?config.driver.kind,
        "running tasks"
    );

    let handle = DriverHandle::open(&config.driver).await?;
    let runner = AdaptiveRunner::from_config(&config, handle.shared())?;
    let report = runner.run_all(&tasks).await;
    drop(runner);
    handle.close().await;

    if let Some(path) = args.report.as_ref() {
        let encoded = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, encoded)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if ctx.json() {
        print_json(&report)?;
    } else {
        print_report(&report);
    }

    if !report.all_succeeded() {
        bail!("{} of {} task(s) failed", report.failed, report.tasks.len());
    }
    Ok(())
}

/// Scripted page loaded from a fixture document
pub fn load_fixture(path: &Path) -> Result<PageFixture> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let fixture = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid fixture JSON in {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid fixture YAML in {}", path.display()))?,
    };
    Ok(fixture)
}

enum DriverHandle {
    Scripted(Arc<ScriptedDriver>),
    #[cfg(feature = "chromium")]
    Chromium(Arc<browser_driver::ChromiumDriver>),
}

impl DriverHandle {
    async fn open(config: &DriverConfig) -> Result<Self> {
        match config.kind {
            DriverKind::Scripted => {
                let fixture = match config.fixture.as_deref() {
                    Some(path) => load_fixture(path)?,
                    None => PageFixture::default(),
                };
                Ok(Self::Scripted(Arc::new(ScriptedDriver::from_fixture(fixture))))
            }
            #[cfg(feature = "chromium")]
            DriverKind::Chromium => {
                let driver = browser_driver::ChromiumDriver::launch(browser_driver::ChromiumConfig {
                    headless: config.headless,
                    executable: config.executable.clone(),
                    base_url: config.base_url.clone(),
                    screenshot_dir: config.screenshot_dir.clone(),
                })
                .await
                .context("Failed to launch chromium")?;
                Ok(Self::Chromium(Arc::new(driver)))
            }
            #[cfg(not(feature = "chromium"))]
            DriverKind::Chromium => {
                bail!("the chromium driver requires building with `--features chromium`")
            }
        }
    }

    fn shared(&self) -> SharedDriver {
        let driver: SharedDriver = match self {
            Self::Scripted(driver) => driver.clone(),
            #[cfg(feature = "chromium")]
            Self::Chromium(driver) => driver.clone(),
        };
        driver
    }

    async fn close(self) {
        match self {
            Self::Scripted(_) => {}
            #[cfg(feature = "chromium")]
            Self::Chromium(driver) => match Arc::try_unwrap(driver) {
                Ok(driver) => {
                    if let Err(err) = driver.shutdown().await {
                        tracing::warn!(error = %err, "chromium shutdown failed");
                    }
                }
                Err(_) => tracing::warn!("chromium driver still shared; skipping shutdown"),
            },
        }
    }
}

fn print_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    for run in &report.tasks {
        let status = if run.recovered() {
            "RECOVERED"
        } else if run.succeeded() {
            "PASSED"
        } else {
            "FAILED"
        };
        println!("{:<10} {}", status, run.root_id);
        for attempt in &run.attempts {
            let outcome = &attempt.outcome;
            println!(
                "  {:<16} {:<9} {:<20} {:>6}ms {}",
                attempt.task_id,
                outcome.status.as_str(),
                outcome.reason.map(|r| r.as_str()).unwrap_or("-"),
                outcome.duration,
                attempt
                    .rule_id
                    .as_deref()
                    .map(|rule| format!("via {rule}"))
                    .unwrap_or_default()
            );
            if let Some(error) = outcome.error.as_deref() {
                println!("    error: {error}");
            }
            if let Some(note) = attempt.note.as_deref() {
                println!("    note: {note}");
            }
        }
    }
    println!("{} passed, {} failed", report.succeeded, report.failed);
}
