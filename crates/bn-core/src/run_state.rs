//! Run state tracking
//!
//! Records the outcome of every step of one pipeline run so an operator (or
//! the scheduler) can see which step failed and which were skipped because
//! of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::CoreResult;

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    /// Not started because an upstream step did not succeed
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Record of one finished (or skipped) step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// State of a run in progress or completed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string()[..8].to_string(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            steps: Vec::new(),
        }
    }

    /// Load run state from a file path
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)?;
        let state: RunState = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    /// Save run state to a file path atomically
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    pub fn record(&mut self, name: &str, status: StepStatus, duration_ms: u64, error: Option<String>) {
        self.steps.push(StepRecord {
            name: name.to_string(),
            status,
            finished_at: Utc::now(),
            duration_ms,
            error,
        });
    }

    /// Close the run; it failed if any step did not succeed
    pub fn finish(&mut self) {
        self.status = if self.steps.iter().all(|s| s.status == StepStatus::Success) {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.finished_at = Some(Utc::now());
    }

    pub fn status_of(&self, name: &str) -> Option<StepStatus> {
        self.steps.iter().find(|s| s.name == name).map(|s| s.status)
    }

    pub fn failed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .map(|s| s.name.as_str())
            .collect()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_run_state_new() {
        let state = RunState::new();
        assert_eq!(state.run_id.len(), 8);
        assert_eq!(state.status, RunStatus::Running);
        assert!(state.steps.is_empty());
    }

    #[test]
    fn test_finish_completed() {
        let mut state = RunState::new();
        state.record("clean", StepStatus::Success, 12, None);
        state.record("dedup", StepStatus::Success, 7, None);
        state.finish();
        assert_eq!(state.status, RunStatus::Completed);
        assert!(state.finished_at.is_some());
    }

    #[test]
    fn test_finish_failed_when_any_step_skipped() {
        let mut state = RunState::new();
        state.record("clean", StepStatus::Failed, 3, Some("missing erp.csv".into()));
        state.record("dedup", StepStatus::Skipped, 0, None);
        state.record("archive-logs", StepStatus::Success, 1, None);
        state.finish();
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.failed_steps(), vec!["clean"]);
        assert_eq!(state.status_of("dedup"), Some(StepStatus::Skipped));
        assert_eq!(state.status_of("ghost"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/run_state.json");

        let mut state = RunState::new();
        state.record("fusion", StepStatus::Success, 40, None);
        state.finish();
        state.save(&path).unwrap();

        let loaded = RunState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.run_id, state.run_id);
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.status, RunStatus::Completed);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_missing() {
        let dir = tempdir().unwrap();
        assert!(RunState::load(&dir.path().join("none.json")).unwrap().is_none());
    }
}
