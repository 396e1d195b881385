//! Task scheduling
//!
//! Each task runs on its own [`TaskScheduler`]: catch up if overdue, otherwise
//! wait out the rest of the period measured from the last success, then run
//! once per period until stopped.

mod task_scheduler;

pub use task_scheduler::{SchedulerHandle, SchedulerState, TaskScheduler, first_delay};
