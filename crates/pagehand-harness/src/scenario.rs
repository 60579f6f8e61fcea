//! Scenario lifecycle
//!
//! A [`Scenario`] owns one dispatch proxy from start to finish. Finishing
//! captures a screenshot into the reports directory and then ends the driver
//! session; the session is ended even when the screenshot fails.

use crate::config::HarnessConfig;
use chrono::{DateTime, Utc};
use pagehand::{CandidateRegistry, DispatchProxy, Driver, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioOutcome {
    /// Every step passed
    Passed,
    /// A step failed
    Failed,
    /// The scenario did not run to completion
    Skipped,
}

impl ScenarioOutcome {
    /// Outcome of a step result
    #[must_use]
    pub const fn of<T>(result: &HarnessResult<T>) -> Self {
        match result {
            Ok(_) => Self::Passed,
            Err(_) => Self::Failed,
        }
    }

    /// Whether the scenario passed
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Record of a finished scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// How it ended
    pub outcome: ScenarioOutcome,
    /// Driver session, read before the session was ended
    pub session_id: Option<String>,
    /// Saved screenshot, if capture succeeded
    pub screenshot: Option<PathBuf>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Operations resolved to page objects during the scenario
    pub resolved_operations: Vec<String>,
    /// Errors raised while capturing artifacts or ending the session
    pub teardown_errors: Vec<String>,
}

impl ScenarioReport {
    /// Whether teardown completed without errors
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.teardown_errors.is_empty()
    }

    /// Write the report as `<dir>/<name>.json`
    pub fn write_json(&self, dir: &Path) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", file_stem(&self.name)));
        std::fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }
}

/// One running scenario
#[derive(Debug)]
pub struct Scenario {
    name: String,
    proxy: DispatchProxy,
    reports_dir: PathBuf,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl Scenario {
    /// Start a scenario: build its proxy from the config's wait options and
    /// resolution policy
    #[must_use]
    pub fn start(
        name: impl Into<String>,
        driver: Arc<dyn Driver>,
        registry: CandidateRegistry,
        config: &HarnessConfig,
    ) -> Self {
        let name = name.into();
        info!(scenario = %name, candidates = registry.len(), "scenario started");
        let proxy =
            DispatchProxy::new(driver, config.wait.clone(), registry).with_policy(config.policy);
        Self {
            name,
            proxy,
            reports_dir: config.reports_dir.clone(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Proxy for the scenario's steps
    pub fn proxy(&mut self) -> &mut DispatchProxy {
        &mut self.proxy
    }

    /// Where the end-of-scenario screenshot is written
    #[must_use]
    pub fn screenshot_path(&self) -> PathBuf {
        self.reports_dir.join(format!("{}.png", file_stem(&self.name)))
    }

    /// Run `step` against the proxy and finish with its outcome
    pub fn run<T, F>(mut self, step: F) -> (HarnessResult<T>, ScenarioReport)
    where
        F: FnOnce(&mut DispatchProxy) -> HarnessResult<T>,
    {
        let result = step(&mut self.proxy);
        let report = self.finish(ScenarioOutcome::of(&result));
        (result, report)
    }

    /// Capture the screenshot, then end the driver session.
    ///
    /// Teardown failures are logged and recorded in the report; they never
    /// stop the session from being ended.
    pub fn finish(self, outcome: ScenarioOutcome) -> ScenarioReport {
        let driver = Arc::clone(self.proxy.driver());
        let session_id = driver.session_id();
        let mut teardown_errors = Vec::new();

        let path = self.screenshot_path();
        let screenshot = match capture(driver.as_ref(), &path) {
            Ok(()) => Some(path),
            Err(err) => {
                warn!(scenario = %self.name, error = %err, "screenshot failed");
                teardown_errors.push(err.to_string());
                None
            }
        };

        if let Err(err) = driver.quit() {
            warn!(scenario = %self.name, error = %err, "driver quit failed");
            teardown_errors.push(err.to_string());
        }

        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(scenario = %self.name, %outcome, duration_ms, "scenario finished");

        ScenarioReport {
            resolved_operations: self
                .proxy
                .resolved_operations()
                .into_iter()
                .map(str::to_string)
                .collect(),
            name: self.name,
            outcome,
            session_id,
            screenshot,
            started_at: self.started_at,
            duration_ms,
            teardown_errors,
        }
    }
}

fn capture(driver: &dyn Driver, path: &Path) -> HarnessResult<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    driver.save_screenshot(path)
}

/// Scenario names may contain path separators
fn file_stem(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
