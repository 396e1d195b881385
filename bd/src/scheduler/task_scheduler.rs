//! Per-task scheduling loop

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::{Task, TaskKey};
use crate::runner::TaskRunner;
use crate::status::StatusRecorder;

/// Lifecycle of a task scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Waiting,
    Running,
    Stopped,
}

/// Delay before the first run, or `None` when the task is overdue
///
/// A task that never succeeded is overdue. A `last_success` in the future
/// (clock moved backwards) waits one full period.
pub fn first_delay(now: DateTime<Local>, last_success: Option<DateTime<Local>>, period: Duration) -> Option<Duration> {
    let last = last_success?;
    let Ok(elapsed) = now.signed_duration_since(last).to_std() else {
        return Some(period);
    };
    if elapsed > period {
        None
    } else {
        Some(period - elapsed)
    }
}

/// Drives one task on its period until stopped
pub struct TaskScheduler {
    task: Task,
    runner: Arc<TaskRunner>,
    recorder: StatusRecorder,
    stop_rx: oneshot::Receiver<()>,
    state_tx: watch::Sender<SchedulerState>,
}

impl TaskScheduler {
    /// Start scheduling `task` on its own tokio task
    pub fn spawn(task: Task, runner: Arc<TaskRunner>, recorder: StatusRecorder) -> SchedulerHandle {
        debug!(task = %task.name, "TaskScheduler::spawn: called");
        let (stop_tx, stop_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(SchedulerState::Waiting);
        let key = task.key();
        let name = task.name.clone();

        let scheduler = Self {
            task,
            runner,
            recorder,
            stop_rx,
            state_tx,
        };
        let join = tokio::spawn(scheduler.run());

        SchedulerHandle {
            key,
            name,
            stop_tx: Some(stop_tx),
            state_rx,
            join,
        }
    }

    async fn run(mut self) {
        let period = self.task.period;
        info!(task = %self.task.name, period = %self.task.period_str, "Scheduler started");

        match first_delay(Local::now(), self.task.last_success(), period) {
            None => debug!(task = %self.task.name, "Task is overdue, running now"),
            Some(delay) => {
                debug!(task = %self.task.name, ?delay, "Waiting for first run");
                if !self.wait(tokio::time::sleep(delay)).await {
                    return self.finish();
                }
            }
        }

        let started = Instant::now();
        self.run_once().await;

        let Some(first_tick) = started.checked_add(period) else {
            error!(task = %self.task.name, period = %self.task.period_str, "Period cannot be scheduled");
            return self.finish();
        };
        let mut ticker = tokio::time::interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.wait(ticker.tick()).await {
            self.run_once().await;
        }
        self.finish();
    }

    /// Wait on `until` unless stopped first; returns false when stopped
    async fn wait(&mut self, until: impl Future) -> bool {
        self.state_tx.send_replace(SchedulerState::Waiting);
        tokio::select! {
            biased;
            _ = &mut self.stop_rx => false,
            _ = until => true,
        }
    }

    async fn run_once(&mut self) {
        self.state_tx.send_replace(SchedulerState::Running);
        let outcome = self.runner.run(&self.task).await;
        self.task.history.record(&outcome);
        if let Err(e) = self.recorder.record(self.task.key(), outcome).await {
            warn!(task = %self.task.name, error = %e, "Failed to report run outcome");
        }
    }

    fn finish(&self) {
        self.state_tx.send_replace(SchedulerState::Stopped);
        info!(task = %self.task.name, "Scheduler stopped");
    }
}

/// Handle to a running [`TaskScheduler`]
///
/// Dropping the handle without calling [`stop`](Self::stop) also stops the
/// scheduler at its next wait point.
pub struct SchedulerHandle {
    key: TaskKey,
    name: String,
    stop_tx: Option<oneshot::Sender<()>>,
    state_rx: watch::Receiver<SchedulerState>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the scheduler to stop; an in-flight run completes first
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            debug!(task = %self.name, "SchedulerHandle::stop: called");
            let _ = tx.send(());
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait until the scheduler's loop has exited
    pub async fn join(self) -> Result<(), JoinError> {
        self.join.await
    }
}
