//! Status recorder messages

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{RunOutcome, StatusDocument, TaskKey};

/// Errors talking to the recorder actor
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status recorder is not running")]
    ChannelClosed,
}

/// Commands sent to the StatusRecorder actor
#[derive(Debug)]
pub enum StatusCommand {
    /// Apply a run outcome to the task's history
    Record { key: TaskKey, outcome: RunOutcome },

    /// Replace the tracked task set after a reconciliation
    Replace { document: StatusDocument },

    /// Current in-memory status document
    Snapshot { reply: oneshot::Sender<StatusDocument> },

    /// Persist now if anything changed, reply when done
    Flush { reply: oneshot::Sender<()> },

    Shutdown,
}
