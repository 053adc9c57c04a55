// Configuration parsing from nohr.toml

use std::fs;
use std::path::{Path, PathBuf};

use nohr_router::{RouteConventions, RouteTableBuilder, DEFAULT_MANIFEST_PATH};
use serde::{Deserialize, Serialize};

use crate::client::ReconnectPolicy;
use crate::error::{DevError, Result};

pub const DEFAULT_CONFIG_FILE: &str = "nohr.toml";

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NohrConfig {
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Where routes live and how route files are named
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing page files (default: "app/(pages)")
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Directory containing API route files (default: "app/api")
    #[serde(default = "default_api_dir")]
    pub api_dir: String,

    /// Cached manifest location (default: ".nohr/routes.json")
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    #[serde(flatten)]
    pub conventions: RouteConventions,
}

/// Development loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the update channel server
    #[serde(default = "default_hmr_port")]
    pub hmr_port: u16,

    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,

    #[serde(default = "default_client_entry")]
    pub client_entry: String,

    #[serde(default = "default_server_entry")]
    pub server_entry: String,

    /// Paths (files or directories) whose changes require a server rebuild
    #[serde(default = "default_server_paths")]
    pub server_paths: Vec<String>,

    /// Paths whose script changes require a client rebuild
    #[serde(default = "default_client_paths")]
    pub client_paths: Vec<String>,

    #[serde(default = "default_style_extensions")]
    pub style_extensions: Vec<String>,

    #[serde(default = "default_script_extensions")]
    pub script_extensions: Vec<String>,

    /// Directory names never watched
    #[serde(default = "default_ignored_dirs")]
    pub ignored_dirs: Vec<String>,

    /// Duplicate notifications for one path inside this window are dropped
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

/// External commands, each given as program plus arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_client_build")]
    pub client_build: Vec<String>,

    #[serde(default = "default_server_build")]
    pub server_build: Vec<String>,

    #[serde(default = "default_server_run")]
    pub server_run: Vec<String>,
}

// Default values
fn default_pages_dir() -> String {
    "app/(pages)".to_string()
}

fn default_api_dir() -> String {
    "app/api".to_string()
}

fn default_manifest_path() -> String {
    DEFAULT_MANIFEST_PATH.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_hmr_port() -> u16 {
    3002
}

fn default_watch_paths() -> Vec<String> {
    strings(&["app", "src", "package.json"])
}

fn default_client_entry() -> String {
    "src/client.tsx".to_string()
}

fn default_server_entry() -> String {
    "src/server.ts".to_string()
}

fn default_server_paths() -> Vec<String> {
    strings(&["app/api", "package.json"])
}

fn default_client_paths() -> Vec<String> {
    strings(&["app", "src/components"])
}

fn default_style_extensions() -> Vec<String> {
    strings(&["css", "scss", "sass", "less"])
}

fn default_script_extensions() -> Vec<String> {
    strings(&["ts", "tsx", "js", "jsx", "json"])
}

fn default_ignored_dirs() -> Vec<String> {
    strings(&["node_modules", "dist", ".nohr"])
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_client_build() -> Vec<String> {
    strings(&["node", "esbuild.hmr.config.js", "client"])
}

fn default_server_build() -> Vec<String> {
    strings(&["node", "esbuild.hmr.config.js", "server"])
}

fn default_server_run() -> Vec<String> {
    strings(&["node", "dist/server.js"])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            api_dir: default_api_dir(),
            manifest_path: default_manifest_path(),
            conventions: RouteConventions::default(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            hmr_port: default_hmr_port(),
            watch_paths: default_watch_paths(),
            client_entry: default_client_entry(),
            server_entry: default_server_entry(),
            server_paths: default_server_paths(),
            client_paths: default_client_paths(),
            style_extensions: default_style_extensions(),
            script_extensions: default_script_extensions(),
            ignored_dirs: default_ignored_dirs(),
            debounce_ms: default_debounce_ms(),
            commands: CommandsConfig::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            client_build: default_client_build(),
            server_build: default_server_build(),
            server_run: default_server_run(),
        }
    }
}

impl NohrConfig {
    /// Load configuration from a nohr.toml file
    ///
    /// A missing or empty file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| DevError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: NohrConfig = toml::from_str(&content).map_err(|e| DevError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate(path)?;
        Ok(config)
    }

    /// Load configuration from the default path (./nohr.toml)
    pub fn load_default() -> Result<Self> {
        Self::load(DEFAULT_CONFIG_FILE)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |message: &str| DevError::Config {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if self.dev.commands.server_run.is_empty() {
            return Err(invalid("dev.commands.server_run must name a program"));
        }
        if self.dev.reconnect.factor < 1.0 {
            return Err(invalid("dev.reconnect.factor must be at least 1.0"));
        }
        Ok(())
    }
}

impl RoutingConfig {
    pub fn pages_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.pages_dir)
    }

    pub fn api_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.api_dir)
    }

    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.manifest_path)
    }

    pub fn route_builder(&self, project_root: &Path) -> RouteTableBuilder {
        RouteTableBuilder::new(self.pages_dir(project_root), self.api_dir(project_root))
            .with_conventions(self.conventions.clone())
    }
}
