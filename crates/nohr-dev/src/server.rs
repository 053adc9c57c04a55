//! Development server: watcher, coordinator, channel and supervisor wired together

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nohr_router::{ManifestCache, SharedManifest};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::bundler::{BuildTarget, Bundler, CommandBundler};
use crate::channel::UpdateChannel;
use crate::classify::Classifier;
use crate::config::NohrConfig;
use crate::coordinator::{BuildContext, BuildCoordinator};
use crate::error::{DevError, Result};
use crate::supervisor::ProcessSupervisor;
use crate::watcher::FileWatcher;
use crate::ws::{self, ChannelState};

/// Options the CLI can override on top of `nohr.toml`
#[derive(Debug, Clone, Default)]
pub struct DevOptions {
    pub port: Option<u16>,
    /// Skip starting and restarting the application process
    pub no_server: bool,
}

pub struct DevServer {
    config: NohrConfig,
    project_root: PathBuf,
    options: DevOptions,
}

impl DevServer {
    pub fn new(config: NohrConfig, project_root: impl Into<PathBuf>, options: DevOptions) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            options,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn port(&self) -> u16 {
        self.options.port.unwrap_or(self.config.dev.hmr_port)
    }

    /// Runs the dev loop until `shutdown` resolves, then stops the served process
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let dev = &self.config.dev;

        // Startup: a discovery error is fatal before anything is served
        let routes = self.config.routing.route_builder(&self.project_root);
        let cache = ManifestCache::new(self.config.routing.manifest_path(&self.project_root));
        let (initial, status) = {
            let routes = routes.clone();
            let cache = cache.clone();
            tokio::task::spawn_blocking(move || cache.load_validated(&routes))
                .await
                .map_err(|e| DevError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??
        };
        tracing::info!(
            "Routes ready: {} pages, {} API ({:?} cache)",
            initial.pages.len(),
            initial.api.len(),
            status
        );
        let manifest = SharedManifest::new(initial);

        // Update channel
        let channel = UpdateChannel::new();
        let addr: SocketAddr = format!("{}:{}", dev.host, self.port())
            .parse()
            .map_err(|e| DevError::Config {
                path: self.project_root.join(crate::config::DEFAULT_CONFIG_FILE),
                message: format!("invalid dev.host: {}", e),
            })?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("HMR WebSocket server running on ws://{}", listener.local_addr()?);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let state = ChannelState::new(channel.clone(), manifest.clone(), &dev.reconnect, self.port());
        let channel_server = tokio::spawn(ws::serve(listener, state, async move {
            let _ = stop_rx.await;
        }));

        // Initial builds
        let bundler: Arc<dyn Bundler> =
            Arc::new(CommandBundler::from_config(&dev.commands, &self.project_root));
        if let Err(e) = bundler.build(BuildTarget::Client).await {
            tracing::error!("Initial client build failed: {}", e);
        }

        let supervisor = if self.options.no_server {
            None
        } else {
            let supervisor = Arc::new(ProcessSupervisor::new(
                bundler.clone(),
                dev.commands.server_run.clone(),
                &self.project_root,
            ));
            if let Err(e) = supervisor.restart().await {
                tracing::error!("Failed to start server: {}", e);
            }
            Some(supervisor)
        };

        // Watch → coordinate
        let classifier = Arc::new(Classifier::new(
            &self.project_root,
            &self.config.routing,
            dev,
        ));
        let watch_paths: Vec<PathBuf> = dev
            .watch_paths
            .iter()
            .map(|p| self.project_root.join(p))
            .collect();
        let mut watcher = FileWatcher::start(
            &watch_paths,
            classifier.clone(),
            Duration::from_millis(dev.debounce_ms),
        )?;

        let (coordinator, handle) = BuildCoordinator::new(BuildContext {
            routes,
            cache,
            manifest,
            bundler,
            supervisor: supervisor.clone(),
            channel: channel.clone(),
            classifier,
        });
        let coordinator_task = tokio::spawn(coordinator.run());

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = watcher.next() => match event {
                    Some(event) => {
                        if !handle.submit(event) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        tracing::info!("Shutting down dev server...");
        drop(handle);
        coordinator_task.abort();
        if let Some(supervisor) = supervisor {
            supervisor.stop().await;
        }
        channel.disconnect_all();
        let _ = stop_tx.send(());
        match tokio::time::timeout(Duration::from_secs(2), channel_server).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => tracing::debug!("Channel server task ended: {}", e),
            Err(_) => tracing::debug!("Channel server did not stop in time"),
        }
        Ok(())
    }
}
