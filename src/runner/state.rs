use serde::{Deserialize, Serialize};

use crate::parser::types::Platform;

/// Replay run lifecycle. `Done` and `Aborted` are final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ready,
    Running,
    Done,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Aborted)
    }
}

/// One failed action, keyed by the driver session that owned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionFailure {
    pub action_id: i32,
    pub driver_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub reason: String,
}

/// Outcome of one replay run.
///
/// `Done` means every mandatory action succeeded; `Aborted` carries the
/// first mandatory failure. Optional actions that failed are logged in
/// `optional_failures` either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub status: RunStatus,
    /// Actions that dispatched successfully.
    pub executed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ActionFailure>,
    pub optional_failures: Vec<ActionFailure>,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
}

impl RunResult {
    pub fn is_done(&self) -> bool {
        self.status == RunStatus::Done
    }
}
