//! Classified file change events

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What kind of rebuild a changed file requires
///
/// Ordered by the amount of work a rebuild takes: a server rebuild also
/// refreshes everything a client or style rebuild would.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Style,
    Client,
    Server,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Classification::Style => "style",
            Classification::Client => "client",
            Classification::Server => "server",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub classification: Classification,
    /// Absolute path as reported by the watcher
    pub path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(classification: Classification, path: impl Into<PathBuf>) -> Self {
        Self {
            classification,
            path: path.into(),
            timestamp: Utc::now(),
        }
    }

    /// Collapses a later queued event into this one
    ///
    /// The later event's path and timestamp win; the classification is the
    /// stronger of the two so a queued server change is never downgraded.
    pub fn absorb(self, later: ChangeEvent) -> ChangeEvent {
        ChangeEvent {
            classification: self.classification.max(later.classification),
            path: later.path,
            timestamp: later.timestamp,
        }
    }
}
