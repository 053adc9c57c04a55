/// Lazy iterator over a relative directory and its ancestors
///
/// For `dashboard/settings/team`, yields:
/// `dashboard/settings/team` → `dashboard/settings` → `dashboard` → `""`
///
/// The empty string is the scan root and is always the last item.
///
/// # Examples
///
/// ```
/// use nohr_router::path::DirHierarchy;
///
/// let dirs: Vec<&str> = DirHierarchy::new("a/b/c").collect();
/// assert_eq!(dirs, vec!["a/b/c", "a/b", "a", ""]);
///
/// let root: Vec<&str> = DirHierarchy::new("").collect();
/// assert_eq!(root, vec![""]);
/// ```
#[derive(Debug, Clone)]
pub struct DirHierarchy<'a> {
    current: Option<&'a str>,
}

impl<'a> DirHierarchy<'a> {
    /// Starts at `dir`, which must use `/` separators (see [`super::to_source_ref`])
    pub fn new(dir: &'a str) -> Self {
        Self {
            current: Some(dir.trim_matches('/')),
        }
    }
}

impl<'a> Iterator for DirHierarchy<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        self.current = if current.is_empty() {
            None
        } else {
            match current.rfind('/') {
                Some(pos) => Some(&current[..pos]),
                None => Some(""),
            }
        };

        Some(current)
    }
}
