//! Incremental build coordinator
//!
//! One task owns the build loop. Events that arrive while a build is running
//! wait in the queue; when the build finishes they are collapsed into a single
//! follow-up build.
//!
//! ```text
//! Idle --event--> Building --done, queue empty--> Idle
//!                    ^                |
//!                    +--queue drained-+
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nohr_router::{ManifestCache, RouteTableBuilder, SharedManifest};
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::bundler::{BuildTarget, Bundler};
use crate::channel::UpdateChannel;
use crate::classify::Classifier;
use crate::error::{DevError, Result};
use crate::event::{ChangeEvent, Classification};
use crate::supervisor::ProcessSupervisor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildState {
    Idle,
    Building,
}

/// Counters exposed for tests and status output
#[derive(Debug, Default)]
pub struct BuildStats {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    collapsed: AtomicU64,
}

impl BuildStats {
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    /// Queued events that were folded into another build
    pub fn collapsed(&self) -> u64 {
        self.collapsed.load(Ordering::SeqCst)
    }
}

/// Everything a build needs
#[derive(Clone)]
pub struct BuildContext {
    pub routes: RouteTableBuilder,
    pub cache: ManifestCache,
    pub manifest: SharedManifest,
    pub bundler: Arc<dyn Bundler>,
    /// `None` when no server process is supervised
    pub supervisor: Option<Arc<ProcessSupervisor>>,
    pub channel: UpdateChannel,
    pub classifier: Arc<Classifier>,
}

/// Sending side of the coordinator, plus its observable state
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    state: watch::Receiver<BuildState>,
    stats: Arc<BuildStats>,
}

impl CoordinatorHandle {
    /// Queues an event; `false` once the coordinator has stopped
    pub fn submit(&self, event: ChangeEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn state(&self) -> BuildState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Resolves once the coordinator is idle
    pub async fn wait_idle(&mut self) {
        let _ = self.state.wait_for(|state| *state == BuildState::Idle).await;
    }
}

pub struct BuildCoordinator {
    ctx: BuildContext,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    state: watch::Sender<BuildState>,
    stats: Arc<BuildStats>,
}

impl BuildCoordinator {
    pub fn new(ctx: BuildContext) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(BuildState::Idle);
        let stats = Arc::new(BuildStats::default());

        let handle = CoordinatorHandle {
            tx,
            state: state_rx,
            stats: stats.clone(),
        };
        let coordinator = Self {
            ctx,
            rx,
            state: state_tx,
            stats,
        };
        (coordinator, handle)
    }

    /// Runs until every handle is dropped
    pub async fn run(mut self) {
        while let Some(first) = self.rx.recv().await {
            let mut next = Some(first);

            while let Some(event) = next.take() {
                self.state.send_replace(BuildState::Building);
                self.build(event).await;
                next = self.drain_queue();
            }

            self.state.send_replace(BuildState::Idle);
        }
    }

    /// Collapses everything queued during the last build into one event
    fn drain_queue(&mut self) -> Option<ChangeEvent> {
        let mut merged: Option<ChangeEvent> = None;
        while let Ok(event) = self.rx.try_recv() {
            merged = Some(match merged {
                Some(earlier) => {
                    self.stats.collapsed.fetch_add(1, Ordering::SeqCst);
                    earlier.absorb(event)
                }
                None => event,
            });
        }
        merged
    }

    async fn build(&self, event: ChangeEvent) {
        self.stats.started.fetch_add(1, Ordering::SeqCst);
        let file = self.ctx.classifier.relative(&event.path);
        tracing::info!("Rebuilding for {} change: {}", event.classification, file);

        match self.run_build(&event).await {
            Ok(()) => {
                self.stats.succeeded.fetch_add(1, Ordering::SeqCst);
                let kind = self.ctx.classifier.update_kind(&event);
                self.ctx.channel.notify_update(kind, &file, event.timestamp);
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::SeqCst);
                tracing::error!("Build failed: {}", e);
                self.ctx.channel.notify_error(&e.to_string());
            }
        }
    }

    async fn run_build(&self, event: &ChangeEvent) -> Result<()> {
        self.regenerate_routes().await?;

        match (event.classification, &self.ctx.supervisor) {
            (Classification::Server, Some(supervisor)) => supervisor.restart().await.map(|_| ()),
            (Classification::Server, None) => self.ctx.bundler.build(BuildTarget::Server).await,
            (Classification::Client | Classification::Style, _) => {
                self.ctx.bundler.build(BuildTarget::Client).await
            }
        }
    }

    /// Rescans both route trees, writes the cache and publishes the result
    async fn regenerate_routes(&self) -> Result<()> {
        let routes = self.ctx.routes.clone();
        let cache = self.ctx.cache.clone();

        let manifest = tokio::task::spawn_blocking(move || {
            let manifest = routes.build()?;
            cache.write(&manifest)?;
            Ok::<_, DevError>(manifest)
        })
        .await
        .map_err(|e| DevError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        self.ctx.manifest.publish(manifest);
        Ok(())
    }
}
