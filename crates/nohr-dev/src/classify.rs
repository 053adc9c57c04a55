//! File classification for the watcher
//!
//! Decides whether a changed path needs a style, client or server rebuild,
//! and which update type the browser runtime receives for it.

use std::path::{Component, Path, PathBuf};

use crate::channel::UpdateKind;
use crate::config::{DevConfig, RoutingConfig};
use crate::event::{ChangeEvent, Classification};

#[derive(Debug, Clone)]
pub struct Classifier {
    project_root: PathBuf,
    pages_dir: String,
    client_entry: String,
    server_entry: String,
    client_paths: Vec<String>,
    server_paths: Vec<String>,
    style_extensions: Vec<String>,
    script_extensions: Vec<String>,
    ignored_dirs: Vec<String>,
}

impl Classifier {
    pub fn new(project_root: impl Into<PathBuf>, routing: &RoutingConfig, dev: &DevConfig) -> Self {
        Self {
            project_root: project_root.into(),
            pages_dir: normalize(&routing.pages_dir),
            client_entry: normalize(&dev.client_entry),
            server_entry: normalize(&dev.server_entry),
            client_paths: dev.client_paths.iter().map(|p| normalize(p)).collect(),
            server_paths: dev.server_paths.iter().map(|p| normalize(p)).collect(),
            style_extensions: dev.style_extensions.clone(),
            script_extensions: dev.script_extensions.clone(),
            ignored_dirs: dev.ignored_dirs.clone(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Path relative to the project root with `/` separators
    ///
    /// Paths outside the project are returned as given.
    pub fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);
        relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// True for hidden files, editor artifacts and anything under an ignored directory
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.project_root).unwrap_or(path);

        let hidden_or_ignored = relative.components().any(|c| match c {
            Component::Normal(part) => {
                let part = part.to_string_lossy();
                part.starts_with('.') || self.ignored_dirs.iter().any(|d| *d == part)
            }
            _ => false,
        });

        let name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        hidden_or_ignored || name.ends_with('~') || name.ends_with(".swp") || name.ends_with(".tmp")
    }

    /// Classification precedence: style, then server, then client
    pub fn classify(&self, path: &Path) -> Option<Classification> {
        if self.is_ignored(path) {
            return None;
        }

        let relative = self.relative(path);
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if self.style_extensions.iter().any(|e| e == extension) {
            return Some(Classification::Style);
        }

        if relative == self.server_entry || within_any(&relative, &self.server_paths) {
            return Some(Classification::Server);
        }

        let is_script = self.script_extensions.iter().any(|e| e == extension);
        if relative == self.client_entry || (is_script && within_any(&relative, &self.client_paths)) {
            return Some(Classification::Client);
        }

        None
    }

    /// Wire update type for a successful build triggered by `event`
    pub fn update_kind(&self, event: &ChangeEvent) -> UpdateKind {
        match event.classification {
            Classification::Style => UpdateKind::Css,
            Classification::Server => UpdateKind::Client,
            Classification::Client => {
                let relative = self.relative(&event.path);
                let is_component = matches!(
                    event.path.extension().and_then(|e| e.to_str()),
                    Some("tsx") | Some("jsx")
                );
                if is_component && within(&relative, &self.pages_dir) {
                    UpdateKind::Component
                } else {
                    UpdateKind::Client
                }
            }
        }
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

/// `relative` equals `prefix` or lies below it (segment-wise, not by string prefix)
fn within(relative: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || relative == prefix
        || relative
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

fn within_any(relative: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| within(relative, p))
}
