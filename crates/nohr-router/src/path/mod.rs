/// Path utilities shared by discovery and matching
///
/// All functions are pure: no filesystem access, no allocation beyond the
/// returned value.
use std::path::{Component, Path};

pub mod hierarchy;
pub use hierarchy::DirHierarchy;

/// Splits a request path into the segments the matcher aligns against
///
/// Returns `None` when the path does not start with `/`. The root path has
/// zero segments. No normalization is applied, so a trailing slash leaves an
/// empty last segment that no pattern segment accepts.
///
/// # Examples
///
/// ```
/// use nohr_router::path::request_segments;
///
/// assert_eq!(request_segments("/"), Some(vec![]));
/// assert_eq!(request_segments("/users/42"), Some(vec!["users", "42"]));
/// assert_eq!(request_segments("/about/"), Some(vec!["about", ""]));
/// assert_eq!(request_segments("about"), None);
/// ```
pub fn request_segments(path: &str) -> Option<Vec<&str>> {
    let rest = path.strip_prefix('/')?;
    if rest.is_empty() {
        return Some(Vec::new());
    }
    Some(rest.split('/').collect())
}

/// Renders a relative filesystem path with `/` separators
///
/// Used for source references so manifests are identical across platforms.
///
/// ```
/// use std::path::Path;
/// use nohr_router::path::to_source_ref;
///
/// assert_eq!(to_source_ref(Path::new("users/[id]/page.tsx")), "users/[id]/page.tsx");
/// ```
pub fn to_source_ref(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory part of a `/`-separated source reference (`""` for root files)
pub fn parent_dir(source_ref: &str) -> &str {
    match source_ref.rfind('/') {
        Some(pos) => &source_ref[..pos],
        None => "",
    }
}
