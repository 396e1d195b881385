//! Run status with actor pattern
//!
//! StatusRecorder owns every task's run history and is the only writer of the
//! status document.

mod messages;
mod recorder;

pub use messages::{StatusCommand, StatusError};
pub use recorder::{DEFAULT_CHANNEL_CAPACITY, StatusRecorder, StatusSink};
