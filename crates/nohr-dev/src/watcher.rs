//! File watcher
//!
//! ```text
//! notify → kind filter → Classifier → Coalescer → ChangeEvent
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::classify::Classifier;
use crate::error::Result;
use crate::event::ChangeEvent;

/// True for events that may change file contents
///
/// Access and metadata-only notifications (mtime, permissions) are dropped.
pub fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Holds back change events until their path has been quiet for a window
///
/// Editors often write several times per save. Each notification restarts the
/// path's window and replaces the pending event, so the event emitted for a
/// path always follows its last write.
#[derive(Debug)]
pub struct Coalescer {
    window: Duration,
    pending: HashMap<PathBuf, (ChangeEvent, Instant)>,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Records a notification seen at `now`
    pub fn push(&mut self, event: ChangeEvent, now: Instant) {
        let event = match self.pending.remove(&event.path) {
            Some((earlier, _)) => earlier.absorb(event),
            None => event,
        };
        self.pending.insert(event.path.clone(), (event, now));
    }

    /// When the earliest pending path becomes ready
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|(_, seen)| *seen + self.window)
            .min()
    }

    /// Removes and returns every event whose path has been quiet for the window
    pub fn take_ready(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let window = self.window;
        let mut ready: Vec<ChangeEvent> = Vec::new();
        self.pending.retain(|_, (event, seen)| {
            if now.saturating_duration_since(*seen) >= window {
                ready.push(event.clone());
                false
            } else {
                true
            }
        });
        ready.sort_by(|a, b| a.path.cmp(&b.path));
        ready
    }

    /// Removes and returns everything still pending
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut events: Vec<ChangeEvent> =
            self.pending.drain().map(|(_, (event, _))| event).collect();
        events.sort_by(|a, b| a.path.cmp(&b.path));
        events
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Watches source roots and yields classified, coalesced change events
pub struct FileWatcher {
    rx: mpsc::Receiver<ChangeEvent>,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Starts watching `paths` recursively
    ///
    /// Paths that do not exist are skipped with a warning. Must be called from
    /// within a Tokio runtime.
    pub fn start(paths: &[PathBuf], classifier: Arc<Classifier>, window: Duration) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = raw_tx.send(res);
        })?;

        for path in paths {
            if path.exists() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                tracing::info!("Watching: {}", path.display());
            } else {
                tracing::warn!("Path does not exist: {}", path.display());
            }
        }

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(classify_loop(raw_rx, tx, classifier, Coalescer::new(window)));

        Ok(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Next change event; `None` after the watcher has stopped
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

async fn classify_loop(
    mut raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    tx: mpsc::Sender<ChangeEvent>,
    classifier: Arc<Classifier>,
    mut coalescer: Coalescer,
) {
    loop {
        let deadline = coalescer.next_deadline();

        tokio::select! {
            res = raw_rx.recv() => match res {
                Some(Ok(event)) => record(&classifier, &mut coalescer, event),
                Some(Err(e)) => tracing::error!("Watch error: {}", e),
                None => {
                    let _ = emit(&tx, &classifier, coalescer.drain()).await;
                    return;
                }
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now).into()),
                if deadline.is_some() =>
            {
                let ready = coalescer.take_ready(Instant::now());
                if emit(&tx, &classifier, ready).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn record(classifier: &Classifier, coalescer: &mut Coalescer, event: Event) {
    if !is_content_change(&event.kind) {
        return;
    }

    let now = Instant::now();
    for path in event.paths {
        if let Some(classification) = classifier.classify(&path) {
            coalescer.push(ChangeEvent::new(classification, path), now);
        }
    }
}

async fn emit(
    tx: &mpsc::Sender<ChangeEvent>,
    classifier: &Classifier,
    events: Vec<ChangeEvent>,
) -> std::result::Result<(), mpsc::error::SendError<ChangeEvent>> {
    for event in events {
        tracing::info!(
            "File changed: {} ({})",
            classifier.relative(&event.path),
            event.classification
        );
        tx.send(event).await?;
    }
    Ok(())
}
