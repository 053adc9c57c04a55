//! Copy-on-write publication of the current route manifest

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::manifest::RouteManifest;

/// The live manifest, shared between the rebuild loop and request handlers
///
/// Readers take a cheap snapshot and keep using it even if a rebuild
/// publishes a newer manifest meanwhile. Publishing swaps the whole
/// manifest atomically; no reader ever sees a half-built table.
///
/// ```
/// use nohr_router::{RouteManifest, SharedManifest};
///
/// let shared = SharedManifest::default();
/// let before = shared.load();
///
/// shared.publish(RouteManifest::default());
/// assert!(before.pages.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct SharedManifest {
    inner: Arc<ArcSwap<RouteManifest>>,
}

impl SharedManifest {
    pub fn new(manifest: RouteManifest) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(manifest)),
        }
    }

    /// Snapshot of the current manifest
    pub fn load(&self) -> Arc<RouteManifest> {
        self.inner.load_full()
    }

    /// Replaces the current manifest for all future readers
    pub fn publish(&self, manifest: RouteManifest) {
        self.inner.store(Arc::new(manifest));
    }
}

impl Default for SharedManifest {
    fn default() -> Self {
        Self::new(RouteManifest::default())
    }
}
