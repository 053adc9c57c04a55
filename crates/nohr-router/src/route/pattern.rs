/// Pattern parsing for route segments
///
/// Turns the directory part of a route file's path into a typed URL pattern.
/// Parsing is pure: same input, same output, no filesystem access.
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One segment of a URL pattern
///
/// # Examples
///
/// ```
/// use nohr_router::route::pattern::{classify_segment, Segment};
///
/// assert_eq!(classify_segment("about").unwrap(), Segment::Literal("about".into()));
/// assert_eq!(classify_segment("[id]").unwrap(), Segment::Param("id".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches exactly this text (case-sensitive)
    Literal(String),
    /// Matches any single non-empty segment and binds it to the name
    Param(String),
}

impl Segment {
    pub fn is_param(&self) -> bool {
        matches!(self, Segment::Param(_))
    }
}

/// Why a directory name could not become a pattern segment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("empty parameter name in segment `{0}`")]
    EmptyParam(String),

    #[error("unsupported dynamic segment `{0}` (only `[name]` is allowed)")]
    UnsupportedParam(String),

    #[error("parameter `{0}` appears more than once in the same route")]
    DuplicateParam(String),

    #[error("literal segment `{0}` must not start with `:`")]
    ReservedPrefix(String),
}

/// Classifies a single directory name (pure function)
///
/// # Rules
///
/// 1. `[name]` where `name` is made of ASCII letters, digits, `_` or `-` → parameter
/// 2. Any other bracketed name (`[...slug]`, `[[id]]`, `[id?]`) → error
/// 3. Everything else → literal
pub fn classify_segment(segment: &str) -> Result<Segment, PatternError> {
    match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some("") => Err(PatternError::EmptyParam(segment.to_string())),
        Some(inner) if is_param_name(inner) => Ok(Segment::Param(inner.to_string())),
        Some(_) => Err(PatternError::UnsupportedParam(segment.to_string())),
        None if segment.starts_with(':') => Err(PatternError::ReservedPrefix(segment.to_string())),
        None => Ok(Segment::Literal(segment.to_string())),
    }
}

fn is_param_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// An ordered sequence of segments, rendered as `/users/:id`
///
/// The empty sequence is the root pattern `/`.
///
/// # Examples
///
/// ```
/// use nohr_router::RoutePattern;
///
/// let pattern = RoutePattern::from_dir_path("users/[id]").unwrap();
/// assert_eq!(pattern.to_string(), "/users/:id");
/// assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id"]);
///
/// assert_eq!(RoutePattern::from_dir_path("").unwrap().to_string(), "/");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// The root pattern `/`
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a pattern from segments, enforcing unique parameter names
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, PatternError> {
        let mut seen = HashSet::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if !seen.insert(name.as_str()) {
                    return Err(PatternError::DuplicateParam(name.clone()));
                }
            }
        }
        Ok(Self { segments })
    }

    /// Parses the directory part of a route file, relative to the scan root
    ///
    /// Accepts `/` or `\` separators. Empty segments (including a trailing one)
    /// are dropped, so `""` and `"about/"` give `/` and `/about`.
    pub fn from_dir_path(dir: &str) -> Result<Self, PatternError> {
        let segments = dir
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .map(classify_segment)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_segments(segments)
    }

    /// Returns a new pattern with `prefix` in front of this one
    pub fn prefixed(&self, prefix: &RoutePattern) -> Result<Self, PatternError> {
        let segments = prefix
            .segments
            .iter()
            .chain(&self.segments)
            .cloned()
            .collect();
        Self::from_segments(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the pattern contains no parameter segments
    pub fn is_static(&self) -> bool {
        !self.segments.iter().any(Segment::is_param)
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Rendering with parameter names erased (`/users/:`)
    ///
    /// Two patterns with the same shape accept exactly the same paths.
    pub fn shape(&self) -> String {
        render(&self.segments, |segment| match segment {
            Segment::Literal(text) => text.clone(),
            Segment::Param(_) => ":".to_string(),
        })
    }
}

fn render(segments: &[Segment], f: impl Fn(&Segment) -> String) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    segments.iter().fold(String::new(), |mut acc, segment| {
        acc.push('/');
        acc.push_str(&f(segment));
        acc
    })
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = render(&self.segments, |segment| match segment {
            Segment::Literal(text) => text.clone(),
            Segment::Param(name) => format!(":{}", name),
        });
        f.write_str(&rendered)
    }
}

/// Parses the rendered form (`/users/:id`), used for manifests and mount prefixes
impl FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = s
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| match segment.strip_prefix(':') {
                Some("") => Err(PatternError::EmptyParam(segment.to_string())),
                Some(name) if is_param_name(name) => Ok(Segment::Param(name.to_string())),
                Some(_) => Err(PatternError::UnsupportedParam(segment.to_string())),
                None => Ok(Segment::Literal(segment.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_segments(segments)
    }
}

impl TryFrom<String> for RoutePattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoutePattern> for String {
    fn from(pattern: RoutePattern) -> Self {
        pattern.to_string()
    }
}
