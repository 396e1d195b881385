//! Configuration and status documents
//!
//! [`ConfigDocument`] is the raw YAML shape of the backup configuration. It is
//! validated into an immutable [`Snapshot`]. [`StatusDocument`] is the persisted
//! run history, merged back into a snapshot by task identity.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::history::History;
use super::task::{Task, TaskKey};
use crate::duration::parse_duration;
use crate::store::ConfigError;

/// Longest accepted period; anything beyond cannot be put on a timer
pub const MAX_PERIOD: Duration = Duration::from_secs(36500 * 24 * 3600);

/// Raw configuration document as written by the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigDocument {
    pub default_dst: String,
    pub default_period: String,
    pub tasks: Vec<TaskEntry>,
}

/// One task as written in the configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEntry {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub src: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dst: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_succ_time: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_result: Vec<String>,
}

impl ConfigDocument {
    /// Validate and resolve every task, applying document-wide defaults
    pub fn validate(&self) -> Result<Snapshot, ConfigError> {
        debug!(tasks = self.tasks.len(), "ConfigDocument::validate: called");
        let mut tasks = Vec::with_capacity(self.tasks.len());
        let mut seen = HashSet::new();

        for (index, entry) in self.tasks.iter().enumerate() {
            let label = if entry.name.trim().is_empty() {
                format!("tasks[{}]", index)
            } else {
                entry.name.trim().to_string()
            };

            let src = entry.src.trim();
            if src.is_empty() {
                return Err(ConfigError::MissingField { task: label, field: "src" });
            }

            let dst = non_empty_or(&entry.dst, &self.default_dst)
                .ok_or_else(|| ConfigError::MissingField {
                    task: label.clone(),
                    field: "dst",
                })?;

            let period_str = non_empty_or(&entry.period, &self.default_period)
                .ok_or_else(|| ConfigError::MissingField {
                    task: label.clone(),
                    field: "period",
                })?;

            let period = parse_duration(period_str).map_err(|source| ConfigError::InvalidPeriod {
                task: label.clone(),
                value: period_str.to_string(),
                source,
            })?;
            if period.is_zero() {
                return Err(ConfigError::ZeroPeriod { task: label });
            }
            if period > MAX_PERIOD {
                return Err(ConfigError::PeriodTooLarge {
                    task: label,
                    value: period_str.to_string(),
                });
            }

            let key = TaskKey::new(src, dst);
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateTask { key: key.to_string() });
            }

            let name = if entry.name.trim().is_empty() {
                key.to_string()
            } else {
                entry.name.trim().to_string()
            };

            tasks.push(Task {
                name,
                src: key.src,
                dst: key.dst,
                period,
                period_str: period_str.to_string(),
                history: History::new(entry.last_succ_time, entry.recent_result.clone()),
            });
        }

        Ok(Snapshot {
            default_dst: self.default_dst.clone(),
            default_period: self.default_period.clone(),
            tasks,
        })
    }
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> Option<&'a str> {
    let value = value.trim();
    if !value.is_empty() {
        return Some(value);
    }
    let default = default.trim();
    (!default.is_empty()).then_some(default)
}

/// Validated configuration; never mutated after it is published
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub default_dst: String,
    pub default_period: String,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    /// Carry history forward from a status document for matching identities
    ///
    /// Tasks with no match keep whatever history they already have.
    pub fn merge_status(&mut self, status: &StatusDocument) -> usize {
        let mut merged = 0;
        for task in &mut self.tasks {
            let key = task.key();
            if let Some(entry) = status.tasks.iter().find(|s| s.key() == key) {
                task.history = entry.history();
                merged += 1;
            }
        }
        debug!(merged, total = self.tasks.len(), "Snapshot::merge_status: done");
        merged
    }

    /// Status view of this snapshot, used to seed the status recorder
    pub fn status(&self) -> StatusDocument {
        StatusDocument {
            tasks: self.tasks.iter().map(TaskStatus::from_task).collect(),
        }
    }

    pub fn task(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.key() == key)
    }
}

/// Persisted run history for all tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusDocument {
    pub tasks: Vec<TaskStatus>,
}

impl StatusDocument {
    pub fn get(&self, key: &TaskKey) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| &t.key() == key)
    }

    pub fn get_mut(&mut self, key: &TaskKey) -> Option<&mut TaskStatus> {
        self.tasks.iter_mut().find(|t| &t.key() == key)
    }
}

/// Persisted history of one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskStatus {
    pub name: String,
    pub src: String,
    pub dst: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_succ_time: Option<DateTime<Local>>,
    pub recent_result: Vec<String>,
}

impl TaskStatus {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            src: task.src.display().to_string(),
            dst: task.dst.display().to_string(),
            last_succ_time: task.history.last_success,
            recent_result: task.history.recent_results.clone(),
        }
    }

    pub fn key(&self) -> TaskKey {
        TaskKey::new(&self.src, &self.dst)
    }

    pub fn history(&self) -> History {
        History::new(self.last_succ_time, self.recent_result.clone())
    }

    pub fn set_history(&mut self, history: History) {
        self.last_succ_time = history.last_success;
        self.recent_result = history.recent_results;
    }
}
