//! Path matching against a route table
//!
//! Matching is segment-wise and allocation-light: no regex, no I/O, and no
//! normalization of the request path.

use std::collections::HashMap;

use crate::path::request_segments;
use crate::route::{RoutePattern, Segment};
use crate::table::{RouteEntry, RouteTable};

/// A successful match: the winning entry plus its bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub entry: &'a RouteEntry,
    pub params: HashMap<String, String>,
}

impl<'a> MatchResult<'a> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl RoutePattern {
    /// Aligns request segments one-to-one with this pattern
    ///
    /// Literals compare case-sensitively; a parameter accepts any non-empty
    /// segment. Returns the bound parameters on success.
    pub fn matches_segments(&self, segments: &[&str]) -> Option<HashMap<String, String>> {
        if segments.len() != self.len() {
            return None;
        }

        self.segments()
            .iter()
            .zip(segments)
            .try_fold(HashMap::new(), |mut params, (pattern, actual)| match pattern {
                Segment::Literal(text) if text == actual => Some(params),
                Segment::Param(name) if !actual.is_empty() => {
                    params.insert(name.clone(), (*actual).to_string());
                    Some(params)
                }
                _ => None,
            })
    }
}

impl RouteTable {
    /// Finds the first entry, in table order, that accepts `path`
    ///
    /// # Examples
    ///
    /// ```
    /// use nohr_router::{RouteEntry, RoutePattern, RouteTable, SourceRef};
    ///
    /// let table = RouteTable::from_entries(vec![
    ///     RouteEntry::page(RoutePattern::from_dir_path("users/[id]").unwrap(), SourceRef::new("users/[id]/page.tsx"), vec![]),
    ///     RouteEntry::page(RoutePattern::from_dir_path("users/new").unwrap(), SourceRef::new("users/new/page.tsx"), vec![]),
    /// ]);
    ///
    /// let hit = table.match_path("/users/42").unwrap();
    /// assert_eq!(hit.param("id"), Some("42"));
    ///
    /// let hit = table.match_path("/users/new").unwrap();
    /// assert!(hit.params.is_empty());
    ///
    /// assert!(table.match_path("/users/42/extra").is_none());
    /// ```
    pub fn match_path(&self, path: &str) -> Option<MatchResult<'_>> {
        let segments = request_segments(path)?;

        self.iter().find_map(|entry| {
            entry
                .pattern
                .matches_segments(&segments)
                .map(|params| MatchResult { entry, params })
        })
    }
}

/// Free-function form of [`RouteTable::match_path`]
pub fn match_path<'a>(table: &'a RouteTable, path: &str) -> Option<MatchResult<'a>> {
    table.match_path(path)
}
