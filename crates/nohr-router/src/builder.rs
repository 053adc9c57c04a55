//! Builds page and API route tables from the filesystem

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::discovery::{scan, DiscoveredFile};
use crate::error::{Result, RouterError};
use crate::layout::LayoutIndex;
use crate::manifest::RouteManifest;
use crate::methods::detect_exported_methods;
use crate::route::RoutePattern;
use crate::table::{RouteEntry, RouteTable, SourceRef};

/// File naming conventions for route discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConventions {
    pub page_file: String,
    pub layout_file: String,
    pub api_file: String,
    /// URL prefix every API route is mounted under
    pub api_prefix: String,
}

impl Default for RouteConventions {
    fn default() -> Self {
        Self {
            page_file: "page.tsx".to_string(),
            layout_file: "layout.tsx".to_string(),
            api_file: "route.ts".to_string(),
            api_prefix: "/api".to_string(),
        }
    }
}

/// Turns a pages tree and an API tree into a [`RouteManifest`]
///
/// Building is deterministic: identical trees give equal manifests (apart
/// from the generation timestamp).
#[derive(Debug, Clone)]
pub struct RouteTableBuilder {
    pages_dir: PathBuf,
    api_dir: PathBuf,
    conventions: RouteConventions,
}

impl RouteTableBuilder {
    pub fn new(pages_dir: impl Into<PathBuf>, api_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            api_dir: api_dir.into(),
            conventions: RouteConventions::default(),
        }
    }

    pub fn with_conventions(mut self, conventions: RouteConventions) -> Self {
        self.conventions = conventions;
        self
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    pub fn api_dir(&self) -> &Path {
        &self.api_dir
    }

    pub fn conventions(&self) -> &RouteConventions {
        &self.conventions
    }

    /// Scans the pages tree, attaching each page's layout chain
    pub fn build_pages(&self) -> Result<RouteTable> {
        let layouts = LayoutIndex::discover(&self.pages_dir, &self.conventions.layout_file)?;
        let pages = scan(&self.pages_dir, &self.conventions.page_file)?;

        let entries = pages
            .iter()
            .map(|file| {
                let pattern = dir_pattern(file)?;
                let chain = layouts.chain_for(file.relative_dir());
                tracing::debug!(
                    "Page route {} -> {} ({} layouts)",
                    pattern,
                    file.relative,
                    chain.len()
                );
                Ok(RouteEntry::page(pattern, SourceRef::new(&file.relative), chain))
            })
            .collect::<Result<Vec<_>>>()?;

        let table = RouteTable::from_entries(entries);
        let stats = table.stats();
        tracing::info!(
            "Discovered {} page routes ({} static, {} dynamic, {} layouts)",
            stats.total,
            stats.static_routes,
            stats.dynamic_routes,
            layouts.len()
        );
        Ok(table)
    }

    /// Scans the API tree, detecting exported handlers in each route file
    ///
    /// Files that export no recognized method are skipped with a warning.
    pub fn build_api(&self) -> Result<RouteTable> {
        let prefix: RoutePattern =
            self.conventions
                .api_prefix
                .parse()
                .map_err(|reason| RouterError::InvalidRoute {
                    path: self.api_dir.clone(),
                    reason,
                })?;

        let mut entries = Vec::new();
        for file in scan(&self.api_dir, &self.conventions.api_file)? {
            // Detection only needs ASCII export keywords; stray non-UTF-8 bytes are replaced
            let bytes = fs::read(&file.path).map_err(|e| RouterError::discovery(&file.path, e))?;
            let methods = detect_exported_methods(&String::from_utf8_lossy(&bytes));
            if methods.is_empty() {
                tracing::warn!(
                    "Skipping API route {}: no exported HTTP method handlers",
                    file.relative
                );
                continue;
            }

            let pattern = dir_pattern(&file)?
                .prefixed(&prefix)
                .map_err(|reason| RouterError::InvalidRoute {
                    path: file.path.clone(),
                    reason,
                })?;

            tracing::debug!(
                "API route {} -> {} [{}]",
                pattern,
                file.relative,
                methods.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
            );
            entries.push(RouteEntry::api(pattern, SourceRef::new(&file.relative), methods));
        }

        let table = RouteTable::from_entries(entries);
        let stats = table.stats();
        tracing::info!(
            "Discovered {} API routes ({} static, {} dynamic, {} handlers)",
            stats.total,
            stats.static_routes,
            stats.dynamic_routes,
            stats.methods
        );
        Ok(table)
    }

    /// One full discovery pass over both trees
    pub fn build(&self) -> Result<RouteManifest> {
        Ok(RouteManifest::new(self.build_pages()?, self.build_api()?))
    }
}

fn dir_pattern(file: &DiscoveredFile) -> Result<RoutePattern> {
    RoutePattern::from_dir_path(file.relative_dir()).map_err(|reason| RouterError::InvalidRoute {
        path: file.path.clone(),
        reason,
    })
}
