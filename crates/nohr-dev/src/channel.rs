//! Update channel: the set of connected dev clients and what they are sent
//!
//! Transport-agnostic. Each member is a bounded queue drained by its socket
//! task (see [`crate::ws`]); broadcasting never waits on a slow client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Messages pushed to dev clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UpdateMessage {
    Connected,
    Update {
        #[serde(rename = "updateType")]
        update_type: UpdateKind,
        file: String,
        /// Milliseconds since the Unix epoch
        timestamp: i64,
    },
    Error {
        error: String,
        timestamp: i64,
    },
}

/// How the browser runtime should apply an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Full page reload
    Client,
    /// Stylesheet refresh without reload
    Css,
    /// Component update (falls back to reload)
    Component,
}

impl UpdateMessage {
    /// `changed_at` is when the change that triggered the build was seen
    pub fn update(
        update_type: UpdateKind,
        file: impl Into<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self::Update {
            update_type,
            file: file.into(),
            timestamp: changed_at.timestamp_millis(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing a closed enum of plain fields cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub type ClientId = u64;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Members whose queue was full; they miss this message only
    pub skipped: usize,
    /// Members found closed and removed
    pub removed: usize,
}

/// Cheap to clone; all clones share one member set
#[derive(Debug, Clone)]
pub struct UpdateChannel {
    members: Arc<Mutex<HashMap<ClientId, mpsc::Sender<String>>>>,
    next_id: Arc<AtomicU64>,
    capacity: usize,
}

impl UpdateChannel {
    pub const DEFAULT_CAPACITY: usize = 32;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// `capacity` bounds each member's queue of unsent messages
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            members: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            capacity: capacity.max(1),
        }
    }

    /// Adds a member and queues the `connected` greeting for it
    pub fn register(&self) -> (ClientId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let _ = tx.try_send(UpdateMessage::Connected.to_json());
        let total = {
            let mut members = self.members.lock();
            members.insert(id, tx);
            members.len()
        };

        tracing::info!("HMR client connected ({} total)", total);
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) {
        let mut members = self.members.lock();
        if members.remove(&id).is_some() {
            tracing::info!("HMR client disconnected ({} total)", members.len());
        }
    }

    /// Drops every member; their sockets close once their queues drain
    pub fn disconnect_all(&self) -> usize {
        let mut members = self.members.lock();
        let count = members.len();
        members.clear();
        count
    }

    pub fn member_count(&self) -> usize {
        self.members.lock().len()
    }

    /// Sends `message` to every member in one pass
    ///
    /// Full queues are skipped, closed members are removed; neither affects
    /// delivery to the others.
    pub fn broadcast(&self, message: &UpdateMessage) -> BroadcastReport {
        let json = message.to_json();
        let mut report = BroadcastReport::default();

        self.members.lock().retain(|id, tx| match tx.try_send(json.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!("HMR client {} is not keeping up, skipping message", id);
                report.skipped += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("HMR client {} is gone, removing", id);
                report.removed += 1;
                false
            }
        });

        report
    }

    pub fn notify_update(
        &self,
        update_type: UpdateKind,
        file: &str,
        changed_at: DateTime<Utc>,
    ) -> BroadcastReport {
        let report = self.broadcast(&UpdateMessage::update(update_type, file, changed_at));
        tracing::info!(
            "Sent {:?} update for {} to {} clients",
            update_type,
            file,
            report.delivered
        );
        report
    }

    pub fn notify_error(&self, error: &str) -> BroadcastReport {
        let report = self.broadcast(&UpdateMessage::error(error));
        tracing::warn!("Sent error to {} clients: {}", report.delivered, error);
        report
    }
}

impl Default for UpdateChannel {
    fn default() -> Self {
        Self::new()
    }
}
