//! The route manifest and its on-disk cache

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::builder::RouteTableBuilder;
use crate::error::{Result, RouterError};
use crate::table::RouteTable;

/// Default location of the cached manifest, relative to the project root
pub const DEFAULT_MANIFEST_PATH: &str = ".nohr/routes.json";

/// Page and API tables from one discovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    pub pages: RouteTable,
    pub api: RouteTable,
    pub generated_at: DateTime<Utc>,
}

impl RouteManifest {
    pub fn new(pages: RouteTable, api: RouteTable) -> Self {
        Self {
            pages,
            api,
            generated_at: Utc::now(),
        }
    }

    /// Compares tables, ignoring the generation timestamp
    pub fn same_routes(&self, other: &RouteManifest) -> bool {
        self.pages == other.pages && self.api == other.api
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// How a cached manifest compared with a fresh scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The file matched the scan and was left untouched
    Fresh,
    /// The file differed (or could not be parsed) and was rewritten
    Stale,
    /// There was no file; one was written
    Missing,
}

/// JSON manifest cache on disk
#[derive(Debug, Clone)]
pub struct ManifestCache {
    path: PathBuf,
}

impl ManifestCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached manifest; `Ok(None)` when the file does not exist
    pub fn read(&self) -> Result<Option<RouteManifest>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RouterError::manifest(&self.path, e)),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| RouterError::manifest(&self.path, e))
    }

    /// Writes the manifest as pretty JSON, replacing the file atomically
    pub fn write(&self, manifest: &RouteManifest) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| RouterError::manifest(parent, e))?;
        }

        let json = manifest
            .to_json_pretty()
            .map_err(|e| RouterError::manifest(&self.path, e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| RouterError::manifest(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| RouterError::manifest(&self.path, e))?;

        tracing::debug!("Wrote route manifest to {}", self.path.display());
        Ok(())
    }

    /// Rescans with `builder` and brings the cache file up to date
    ///
    /// The cache is never trusted: the fresh scan is always returned. The file
    /// is rewritten when it is missing, unreadable, or describes other routes.
    pub fn load_validated(
        &self,
        builder: &RouteTableBuilder,
    ) -> Result<(RouteManifest, CacheStatus)> {
        let fresh = builder.build()?;

        let status = match self.read() {
            Ok(Some(cached)) if cached.same_routes(&fresh) => CacheStatus::Fresh,
            Ok(Some(_)) => CacheStatus::Stale,
            Ok(None) => CacheStatus::Missing,
            Err(e) => {
                tracing::warn!("Discarding unreadable route manifest: {}", e);
                CacheStatus::Stale
            }
        };

        if status != CacheStatus::Fresh {
            tracing::info!("Route manifest {:?}, rewriting {}", status, self.path.display());
            self.write(&fresh)?;
        }

        Ok((fresh, status))
    }
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new(DEFAULT_MANIFEST_PATH)
    }
}
