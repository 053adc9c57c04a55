//! HTTP method detection for API route files
//!
//! Reads the source text of a route file and reports which handler names it
//! exports. The file is never executed.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown HTTP method `{}`", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

/// Parses the exact uppercase handler name (`GET`, not `get`)
impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

const METHOD_ALTERNATION: &str = "GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS";

// `export function GET(` / `export async function GET(`
static FUNCTION_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bexport\s+(?:async\s+)?function\s*\*?\s*({})\s*\(",
        METHOD_ALTERNATION
    ))
    .expect("function export regex is valid")
});

// `export const GET =`
static CONST_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\bexport\s+(?:const|let|var)\s+({})\s*(?::[^=]*)?=",
        METHOD_ALTERNATION
    ))
    .expect("const export regex is valid")
});

// `export { GET, handler as POST }`
static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bexport\s*(type\s+)?\{([^}]*)\}").expect("export list regex is valid")
});

/// Returns the set of HTTP methods a route file exports
///
/// # Examples
///
/// ```
/// use nohr_router::{detect_exported_methods, HttpMethod};
///
/// let source = r#"
///     export async function GET(req: Request) { return Response.json([]) }
///     export const POST = async (req: Request) => new Response(null, { status: 201 })
/// "#;
///
/// let methods = detect_exported_methods(source);
/// assert!(methods.contains(&HttpMethod::Get));
/// assert!(methods.contains(&HttpMethod::Post));
/// assert_eq!(methods.len(), 2);
/// ```
pub fn detect_exported_methods(source: &str) -> BTreeSet<HttpMethod> {
    let declared = FUNCTION_EXPORT
        .captures_iter(source)
        .chain(CONST_EXPORT.captures_iter(source))
        .filter_map(|caps| caps.get(1))
        .filter_map(|name| name.as_str().parse::<HttpMethod>().ok());

    let listed = EXPORT_LIST
        .captures_iter(source)
        .filter(|caps| caps.get(1).is_none())
        .filter_map(|caps| caps.get(2))
        .flat_map(|list| list.as_str().split(','))
        .filter_map(exported_name)
        .filter_map(|name| name.parse::<HttpMethod>().ok());

    declared.chain(listed).collect()
}

/// The name an export-list item is visible as: `a as GET` → `GET`
fn exported_name(item: &str) -> Option<&str> {
    let tokens: Vec<&str> = item.split_whitespace().collect();
    match tokens.as_slice() {
        [name] => Some(*name),
        [_, "as", alias] => Some(*alias),
        _ => None,
    }
}
