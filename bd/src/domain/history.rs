//! Run outcomes and the bounded per-task history

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Maximum number of recent results kept per task
pub const RECENT_RESULT_CAPACITY: usize = 32;

/// Timestamp format used in rendered result records
const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Success or failure of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResult {
    Success,
    Fail,
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Outcome of one run of a task, emitted by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub time: DateTime<Local>,
    pub result: RunResult,
}

impl RunOutcome {
    pub fn success(time: DateTime<Local>) -> Self {
        Self {
            time,
            result: RunResult::Success,
        }
    }

    pub fn fail(time: DateTime<Local>) -> Self {
        Self {
            time,
            result: RunResult::Fail,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == RunResult::Success
    }

    /// Render as a history record, e.g. `2024-01-02 03:04:05 success`
    pub fn render(&self) -> String {
        format!("{} {}", self.time.format(RECORD_TIME_FORMAT), self.result)
    }
}

/// Last success time plus newest-first recent results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    pub last_success: Option<DateTime<Local>>,
    pub recent_results: Vec<String>,
}

impl History {
    pub fn new(last_success: Option<DateTime<Local>>, mut recent_results: Vec<String>) -> Self {
        recent_results.truncate(RECENT_RESULT_CAPACITY);
        Self {
            last_success,
            recent_results,
        }
    }

    /// Apply an outcome: bump `last_success` on success and prepend a record
    pub fn record(&mut self, outcome: &RunOutcome) {
        if outcome.is_success() {
            self.last_success = Some(outcome.time);
        }
        self.recent_results.insert(0, outcome.render());
        self.recent_results.truncate(RECENT_RESULT_CAPACITY);
    }

    pub fn is_empty(&self) -> bool {
        self.last_success.is_none() && self.recent_results.is_empty()
    }
}
