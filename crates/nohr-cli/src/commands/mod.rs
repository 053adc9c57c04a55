pub mod dev;
pub mod generate;
pub mod listen;
pub mod r#match;
pub mod routes;

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nohr_dev::NohrConfig;
use nohr_router::RouteTableBuilder;

/// Configuration plus the directory it applies to
pub struct Project {
    pub root: PathBuf,
    pub config: NohrConfig,
}

impl Project {
    /// Loads `config_path`; the project root is the directory containing it
    pub fn load(config_path: &Path) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read current directory")?;
        let config_path = cwd.join(config_path);
        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        let config = NohrConfig::load(&config_path)
            .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

        Ok(Self { root, config })
    }

    pub fn route_builder(&self) -> RouteTableBuilder {
        self.config.routing.route_builder(&self.root)
    }
}
