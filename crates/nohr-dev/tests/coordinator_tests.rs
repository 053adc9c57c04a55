//! Integration tests for the build coordinator
//!
//! Uses a gated bundler so tests decide when a build finishes.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nohr_dev::*;
use nohr_router::{ManifestCache, RouteTableBuilder, SharedManifest};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::{mpsc, Semaphore};

struct GatedBundler {
    gate: Semaphore,
    builds: Mutex<Vec<BuildTarget>>,
    fail: Mutex<bool>,
}

impl GatedBundler {
    fn open() -> Arc<Self> {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    fn closed() -> Arc<Self> {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(permits),
            builds: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        })
    }

    fn targets(&self) -> Vec<BuildTarget> {
        self.builds.lock().clone()
    }
}

#[async_trait]
impl Bundler for GatedBundler {
    async fn build(&self, target: BuildTarget) -> nohr_dev::Result<()> {
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        self.builds.lock().push(target);
        if *self.fail.lock() {
            return Err(DevError::Build {
                target,
                message: "Unexpected token in app/(pages)/page.tsx".to_string(),
            });
        }
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    bundler: Arc<GatedBundler>,
    manifest: SharedManifest,
    channel: UpdateChannel,
    handle: CoordinatorHandle,
}

impl Fixture {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn event(&self, classification: Classification, rel: &str) -> ChangeEvent {
        ChangeEvent::new(classification, self.root().join(rel))
    }

    /// Waits until `builds` builds have finished and the coordinator is idle
    async fn settle(&self, builds: u64) {
        let stats = self.handle.stats();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let finished = stats.succeeded() + stats.failed();
                if finished >= builds && self.handle.state() == BuildState::Idle {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("coordinator did not settle");
    }

    async fn wait_started(&self, builds: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.handle.stats().started() < builds {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("build did not start");
    }
}

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn fixture(bundler: Arc<GatedBundler>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "app/(pages)/page.tsx", "export default function Home() {}");
    write(dir.path(), "app/api/users/route.ts", "export const GET = () => {}");

    let config = NohrConfig::default();
    let routes = RouteTableBuilder::new(
        config.routing.pages_dir(dir.path()),
        config.routing.api_dir(dir.path()),
    );
    let manifest = SharedManifest::default();
    let channel = UpdateChannel::new();

    let (coordinator, handle) = BuildCoordinator::new(BuildContext {
        routes,
        cache: ManifestCache::new(config.routing.manifest_path(dir.path())),
        manifest: manifest.clone(),
        bundler: bundler.clone(),
        supervisor: None,
        channel: channel.clone(),
        classifier: Arc::new(Classifier::new(dir.path(), &config.routing, &config.dev)),
    });
    tokio::spawn(coordinator.run());

    Fixture {
        dir,
        bundler,
        manifest,
        channel,
        handle,
    }
}

async fn next_message(rx: &mut mpsc::Receiver<String>) -> UpdateMessage {
    let text = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no message")
        .expect("channel closed");
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_single_build_notifies_clients() {
    let fx = fixture(GatedBundler::open());
    let (_id, mut rx) = fx.channel.register();

    assert_eq!(fx.handle.state(), BuildState::Idle);
    let event = fx.event(Classification::Client, "app/(pages)/page.tsx");
    let changed_at = event.timestamp.timestamp_millis();
    tokio::time::sleep(Duration::from_millis(20)).await;
    fx.handle.submit(event);
    fx.settle(1).await;

    assert_eq!(next_message(&mut rx).await, UpdateMessage::Connected);
    match next_message(&mut rx).await {
        UpdateMessage::Update {
            update_type,
            file,
            timestamp,
        } => {
            assert_eq!(update_type, UpdateKind::Component);
            assert_eq!(file, "app/(pages)/page.tsx");
            assert_eq!(timestamp, changed_at);
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert_eq!(fx.bundler.targets(), vec![BuildTarget::Client]);
}

#[tokio::test]
async fn test_events_during_build_collapse_into_one() {
    let fx = fixture(GatedBundler::closed());

    fx.handle.submit(fx.event(Classification::Client, "app/(pages)/page.tsx"));
    fx.wait_started(1).await;
    assert_eq!(fx.handle.state(), BuildState::Building);

    for name in ["a", "b", "c"] {
        fx.handle
            .submit(fx.event(Classification::Client, &format!("app/(pages)/{}/page.tsx", name)));
    }
    fx.bundler.gate.add_permits(16);
    fx.settle(2).await;

    let stats = fx.handle.stats();
    assert_eq!(stats.started(), 2);
    assert_eq!(stats.succeeded(), 2);
    assert_eq!(stats.collapsed(), 2);
    assert_eq!(fx.bundler.targets().len(), 2);
}

#[tokio::test]
async fn test_queued_server_change_is_not_downgraded() {
    let fx = fixture(GatedBundler::closed());

    fx.handle.submit(fx.event(Classification::Client, "app/(pages)/page.tsx"));
    fx.wait_started(1).await;
    fx.handle.submit(fx.event(Classification::Server, "src/server.ts"));
    fx.handle.submit(fx.event(Classification::Style, "app/globals.css"));
    fx.bundler.gate.add_permits(16);
    fx.settle(2).await;

    assert_eq!(
        fx.bundler.targets(),
        vec![BuildTarget::Client, BuildTarget::Server]
    );
}

#[tokio::test]
async fn test_build_failure_broadcasts_error_without_retry() {
    let fx = fixture(GatedBundler::open());
    *fx.bundler.fail.lock() = true;
    let (_id, mut rx) = fx.channel.register();

    fx.handle.submit(fx.event(Classification::Style, "app/globals.css"));
    fx.settle(1).await;

    assert_eq!(next_message(&mut rx).await, UpdateMessage::Connected);
    match next_message(&mut rx).await {
        UpdateMessage::Error { error, .. } => assert!(error.contains("Unexpected token")),
        other => panic!("expected error, got {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.handle.stats().started(), 1);
    assert_eq!(fx.handle.stats().failed(), 1);
    assert_eq!(fx.handle.state(), BuildState::Idle);

    // Recovers on the next change
    *fx.bundler.fail.lock() = false;
    fx.handle.submit(fx.event(Classification::Style, "app/globals.css"));
    fx.settle(2).await;
    assert_eq!(fx.handle.stats().succeeded(), 1);
    assert!(matches!(
        next_message(&mut rx).await,
        UpdateMessage::Update {
            update_type: UpdateKind::Css,
            ..
        }
    ));
}

#[tokio::test]
async fn test_every_build_regenerates_manifest() {
    let fx = fixture(GatedBundler::open());
    assert!(fx.manifest.load().pages.is_empty());

    write(fx.root(), "app/(pages)/about/page.tsx", "export default function About() {}");
    fx.handle.submit(fx.event(Classification::Client, "app/(pages)/about/page.tsx"));
    fx.settle(1).await;

    let manifest = fx.manifest.load();
    assert!(manifest.pages.match_path("/about").is_some());
    assert!(manifest.api.match_path("/api/users").is_some());

    let cache = ManifestCache::new(fx.root().join(".nohr/routes.json"));
    let cached = cache.read().unwrap().unwrap();
    assert!(cached.same_routes(&manifest));
}

#[tokio::test]
async fn test_discovery_failure_reported_like_build_failure() {
    let fx = fixture(GatedBundler::open());
    let (_id, mut rx) = fx.channel.register();
    write(fx.root(), "app/(pages)/[id]/x/[id]/page.tsx", "");

    fx.handle.submit(fx.event(Classification::Client, "app/(pages)/page.tsx"));
    fx.settle(1).await;

    assert_eq!(fx.handle.stats().failed(), 1);
    assert!(fx.bundler.targets().is_empty());
    assert_eq!(next_message(&mut rx).await, UpdateMessage::Connected);
    assert!(matches!(next_message(&mut rx).await, UpdateMessage::Error { .. }));
}

#[tokio::test]
async fn test_server_change_reloads_clients() {
    let fx = fixture(GatedBundler::open());
    let (_id, mut rx) = fx.channel.register();

    fx.handle.submit(fx.event(Classification::Server, "src/server.ts"));
    fx.settle(1).await;

    assert_eq!(fx.bundler.targets(), vec![BuildTarget::Server]);
    next_message(&mut rx).await;
    assert!(matches!(
        next_message(&mut rx).await,
        UpdateMessage::Update {
            update_type: UpdateKind::Client,
            ..
        }
    ));
}
