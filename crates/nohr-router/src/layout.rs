//! Nested layout resolution
//!
//! A page inherits every layout file found in its own directory and in each
//! ancestor directory up to the scan root.

use std::collections::HashMap;
use std::path::Path;

use crate::discovery::scan;
use crate::error::Result;
use crate::path::DirHierarchy;
use crate::table::SourceRef;

/// Layout files of one scan root, keyed by the directory that contains them
#[derive(Debug, Clone, Default)]
pub struct LayoutIndex {
    by_dir: HashMap<String, SourceRef>,
}

impl LayoutIndex {
    /// Scans `root` for `layout_file` and indexes every hit by directory
    pub fn discover(root: &Path, layout_file: &str) -> Result<Self> {
        let layouts = scan(root, layout_file)?;
        Ok(Self::from_source_refs(
            layouts.into_iter().map(|file| SourceRef::new(file.relative)),
        ))
    }

    pub fn from_source_refs(refs: impl IntoIterator<Item = SourceRef>) -> Self {
        let by_dir = refs
            .into_iter()
            .map(|source| (crate::path::parent_dir(source.as_str()).to_string(), source))
            .collect();
        Self { by_dir }
    }

    pub fn len(&self) -> usize {
        self.by_dir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dir.is_empty()
    }

    /// Layout chain for a page in `dir` (relative, `/`-separated), root first
    ///
    /// # Examples
    ///
    /// ```
    /// use nohr_router::{LayoutIndex, SourceRef};
    ///
    /// let index = LayoutIndex::from_source_refs([
    ///     SourceRef::new("layout.tsx"),
    ///     SourceRef::new("dashboard/layout.tsx"),
    /// ]);
    ///
    /// let chain = index.chain_for("dashboard/settings");
    /// assert_eq!(chain, vec![SourceRef::new("layout.tsx"), SourceRef::new("dashboard/layout.tsx")]);
    /// assert_eq!(index.chain_for("about").len(), 1);
    /// ```
    pub fn chain_for(&self, dir: &str) -> Vec<SourceRef> {
        let mut chain: Vec<SourceRef> = DirHierarchy::new(dir)
            .filter_map(|level| self.by_dir.get(level).cloned())
            .collect();
        chain.reverse();
        chain
    }
}
