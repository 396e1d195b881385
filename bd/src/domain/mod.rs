//! Domain types: tasks, run history, configuration and status documents

mod document;
mod history;
mod task;

pub use document::{ConfigDocument, MAX_PERIOD, Snapshot, StatusDocument, TaskEntry, TaskStatus};
pub use history::{History, RECENT_RESULT_CAPACITY, RunOutcome, RunResult};
pub use task::{Task, TaskKey, clean_path};
