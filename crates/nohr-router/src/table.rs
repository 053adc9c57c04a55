//! Route entries and the ordered, immutable route table

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::methods::HttpMethod;
use crate::route::RoutePattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Page,
    Api,
}

/// Opaque reference to a route file: its path relative to the scan root
///
/// Always `/`-separated. The router never loads or executes the file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(relative: impl Into<String>) -> Self {
        Self(relative.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One discovered page or API route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub kind: RouteKind,
    pub pattern: RoutePattern,
    pub source: SourceRef,
    /// Enclosing layouts, root-most first (pages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layouts: Vec<SourceRef>,
    /// Exported handlers (API routes only)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub methods: BTreeSet<HttpMethod>,
}

impl RouteEntry {
    pub fn page(pattern: RoutePattern, source: SourceRef, layouts: Vec<SourceRef>) -> Self {
        Self {
            kind: RouteKind::Page,
            pattern,
            source,
            layouts,
            methods: BTreeSet::new(),
        }
    }

    pub fn api(pattern: RoutePattern, source: SourceRef, methods: BTreeSet<HttpMethod>) -> Self {
        Self {
            kind: RouteKind::Api,
            pattern,
            source,
            layouts: Vec::new(),
            methods,
        }
    }

    pub fn is_static(&self) -> bool {
        self.pattern.is_static()
    }

    pub fn supports(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }
}

/// Summary counts for a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub total: usize,
    pub static_routes: usize,
    pub dynamic_routes: usize,
    /// Sum of exported methods across entries (zero for page tables)
    pub methods: usize,
}

/// Ordered, immutable sequence of route entries
///
/// Entries without parameters come first; ties are broken by the byte order
/// of the rendered pattern. A table is never changed after construction:
/// rebuilding produces a new one.
///
/// # Examples
///
/// ```
/// use nohr_router::{RouteEntry, RoutePattern, RouteTable, SourceRef};
///
/// let entry = |dir: &str| {
///     RouteEntry::page(
///         RoutePattern::from_dir_path(dir).unwrap(),
///         SourceRef::new(format!("{dir}/page.tsx")),
///         vec![],
///     )
/// };
///
/// let table = RouteTable::from_entries(vec![entry("users/[id]"), entry("users"), entry("about")]);
/// let patterns: Vec<String> = table.iter().map(|e| e.pattern.to_string()).collect();
/// assert_eq!(patterns, vec!["/about", "/users", "/users/:id"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RouteEntry>", into = "Vec<RouteEntry>")]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Sorts `entries` into table order and warns about ambiguous shapes
    pub fn from_entries(mut entries: Vec<RouteEntry>) -> Self {
        entries.sort_by_cached_key(|entry| (!entry.is_static(), entry.pattern.to_string()));

        let mut shapes: HashMap<(RouteKind, String), &RouteEntry> = HashMap::new();
        for entry in &entries {
            let key = (entry.kind, entry.pattern.shape());
            if let Some(winner) = shapes.get(&key) {
                tracing::warn!(
                    "Ambiguous routes: {} ({}) shadows {} ({}); the first one wins",
                    winner.pattern,
                    winner.source,
                    entry.pattern,
                    entry.source
                );
            } else {
                shapes.insert(key, entry);
            }
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> RouteStats {
        let static_routes = self.entries.iter().filter(|e| e.is_static()).count();
        RouteStats {
            total: self.entries.len(),
            static_routes,
            dynamic_routes: self.entries.len() - static_routes,
            methods: self.entries.iter().map(|e| e.methods.len()).sum(),
        }
    }
}

impl From<Vec<RouteEntry>> for RouteTable {
    fn from(entries: Vec<RouteEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<RouteTable> for Vec<RouteEntry> {
    fn from(table: RouteTable) -> Self {
        table.entries
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a RouteEntry;
    type IntoIter = std::slice::Iter<'a, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
