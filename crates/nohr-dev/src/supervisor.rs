//! Process supervisor for the served application
//!
//! At most one instance runs at a time. A restart holds the supervisor lock
//! across build, teardown and spawn, so concurrent restarts run one after the
//! other.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::bundler::{BuildTarget, Bundler};
use crate::error::{DevError, Result};

/// Environment every supervised instance is started with
pub const DEV_ENV: [(&str, &str); 3] = [
    ("NODE_ENV", "development"),
    ("NOHR_DEV_MODE", "true"),
    ("HMR_ENABLED", "true"),
];

pub struct ProcessSupervisor {
    bundler: Arc<dyn Bundler>,
    command: Vec<String>,
    cwd: PathBuf,
    child: Mutex<Option<Child>>,
    restarts: AtomicU64,
}

impl ProcessSupervisor {
    pub fn new(bundler: Arc<dyn Bundler>, command: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            bundler,
            command,
            cwd: cwd.into(),
            child: Mutex::new(None),
            restarts: AtomicU64::new(0),
        }
    }

    /// Rebuilds the server bundle, then replaces the running instance
    ///
    /// A build failure leaves the current instance running. A spawn failure
    /// happens after the old instance is gone; nothing runs until the next
    /// successful restart. Returns the new process id when the OS reports one.
    pub async fn restart(&self) -> Result<Option<u32>> {
        let mut current = self.child.lock().await;

        self.bundler.build(BuildTarget::Server).await?;

        if let Some(old) = current.take() {
            tracing::info!("Stopping existing server...");
            terminate(old).await;
        }

        let child = self.spawn()?;
        let pid = child.id();
        *current = Some(child);

        let count = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("Server started (pid {:?}, start #{})", pid, count);
        Ok(pid)
    }

    /// Terminates the running instance, if any, and waits for it to exit
    pub async fn stop(&self) {
        if let Some(child) = self.child.lock().await.take() {
            tracing::info!("Stopping server...");
            terminate(child).await;
        }
    }

    /// Whether an instance is currently alive
    pub async fn is_running(&self) -> bool {
        match self.child.lock().await.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(Child::id)
    }

    /// Number of successful starts so far
    pub fn starts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    fn spawn(&self) -> Result<Child> {
        let rendered = self.command.join(" ");
        let (program, args) = self.command.split_first().ok_or_else(|| DevError::Config {
            path: self.cwd.clone(),
            message: "server run command is empty".to_string(),
        })?;

        tracing::info!("Starting server: {}", rendered);
        Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .envs(DEV_ENV)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DevError::ProcessSpawn {
                command: rendered,
                source,
            })
    }
}

async fn terminate(mut child: Child) {
    if let Err(e) = child.kill().await {
        tracing::debug!("Server process already gone: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;

    struct StubBundler {
        fail: AtomicBool,
        builds: AtomicU64,
    }

    impl StubBundler {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(false),
                builds: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl Bundler for StubBundler {
        async fn build(&self, target: BuildTarget) -> Result<()> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(DevError::Build {
                    target,
                    message: "type error".to_string(),
                });
            }
            Ok(())
        }
    }

    fn sleeper() -> Vec<String> {
        vec!["sleep".to_string(), "30".to_string()]
    }

    #[tokio::test]
    async fn test_restart_replaces_instance() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = StubBundler::new();
        let supervisor = ProcessSupervisor::new(bundler.clone(), sleeper(), dir.path());

        let first = supervisor.restart().await.unwrap();
        assert!(supervisor.is_running().await);

        let second = supervisor.restart().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(supervisor.pid().await, second);
        assert_eq!(supervisor.starts(), 2);
        assert_eq!(bundler.builds.load(Ordering::SeqCst), 2);

        supervisor.stop().await;
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_build_failure_keeps_current_instance() {
        let dir = tempfile::tempdir().unwrap();
        let bundler = StubBundler::new();
        let supervisor = ProcessSupervisor::new(bundler.clone(), sleeper(), dir.path());

        let pid = supervisor.restart().await.unwrap();
        bundler.fail.store(true, Ordering::SeqCst);

        let err = supervisor.restart().await.unwrap_err();
        assert!(matches!(err, DevError::Build { .. }));
        assert_eq!(supervisor.pid().await, pid);
        assert!(supervisor.is_running().await);

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = ProcessSupervisor::new(
            StubBundler::new(),
            vec!["nohr-definitely-not-a-program".to_string()],
            dir.path(),
        );

        let err = supervisor.restart().await.unwrap_err();
        assert!(matches!(err, DevError::ProcessSpawn { .. }));
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_dev_environment() {
        let dir = tempfile::tempdir().unwrap();
        let script = "printf '%s %s %s' \"$NODE_ENV\" \"$NOHR_DEV_MODE\" \"$HMR_ENABLED\" > env.txt";
        let supervisor = ProcessSupervisor::new(
            StubBundler::new(),
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            dir.path(),
        );

        supervisor.restart().await.unwrap();
        let env_file = dir.path().join("env.txt");
        for _ in 0..100 {
            if std::fs::read_to_string(&env_file).map_or(false, |s| !s.is_empty()) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }

        assert_eq!(
            std::fs::read_to_string(&env_file).unwrap(),
            "development true true"
        );
    }

    #[tokio::test]
    async fn test_concurrent_restarts_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let supervisor = Arc::new(ProcessSupervisor::new(StubBundler::new(), sleeper(), dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let supervisor = supervisor.clone();
                tokio::spawn(async move { supervisor.restart().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(supervisor.starts(), 4);
        assert!(supervisor.is_running().await);
        supervisor.stop().await;
    }
}
