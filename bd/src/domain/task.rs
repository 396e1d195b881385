//! Validated backup task and its identity

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};

use super::history::History;

/// Paths name the same file regardless of case on Windows
const FOLD_CASE: bool = cfg!(windows);

/// Identity of a task across reloads: cleaned source and destination
///
/// Keys compare case-insensitively where the filesystem does, so `C:\Data`
/// and `c:\data` are the same task. The paths keep their original spelling.
#[derive(Debug, Clone)]
pub struct TaskKey {
    pub src: PathBuf,
    pub dst: PathBuf,
}

impl TaskKey {
    pub fn new(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Self {
        Self {
            src: clean_path(src),
            dst: clean_path(dst),
        }
    }

    fn identity(&self) -> (String, String) {
        (identity_form(&self.src, FOLD_CASE), identity_form(&self.dst, FOLD_CASE))
    }
}

impl PartialEq for TaskKey {
    fn eq(&self, other: &Self) -> bool {
        if FOLD_CASE {
            self.identity() == other.identity()
        } else {
            self.src == other.src && self.dst == other.dst
        }
    }
}

impl Eq for TaskKey {}

impl Hash for TaskKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if FOLD_CASE {
            self.identity().hash(state);
        } else {
            self.src.hash(state);
            self.dst.hash(state);
        }
    }
}

impl PartialOrd for TaskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if FOLD_CASE {
            self.identity().cmp(&other.identity())
        } else {
            (&self.src, &self.dst).cmp(&(&other.src, &other.dst))
        }
    }
}

/// Comparison form of a cleaned path, lowercased when `fold_case` is set
fn identity_form(path: &Path, fold_case: bool) -> String {
    let text = path.to_string_lossy();
    if fold_case {
        text.to_lowercase()
    } else {
        text.into_owned()
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}-->{}]", self.src.display(), self.dst.display())
    }
}

/// One scheduled backup unit, fully resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub src: PathBuf,
    pub dst: PathBuf,
    pub period: Duration,
    /// Period as written in the configuration
    pub period_str: String,
    pub history: History,
}

impl Task {
    pub fn key(&self) -> TaskKey {
        TaskKey {
            src: self.src.clone(),
            dst: self.dst.clone(),
        }
    }

    pub fn last_success(&self) -> Option<DateTime<Local>> {
        self.history.last_success
    }

    /// Earliest time the next run is due, relative to `last_success`
    pub fn next_due(&self) -> Option<DateTime<Local>> {
        let last = self.history.last_success?;
        let period = chrono::Duration::from_std(self.period).ok()?;
        last.checked_add_signed(period)
    }
}

/// Lexically clean a path: drop `.`, fold `dir/..`, strip trailing separators.
///
/// An empty path cleans to `.`.
pub fn clean_path(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
