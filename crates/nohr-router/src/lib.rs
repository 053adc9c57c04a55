//! # NOHR Router
//!
//! File-system route discovery and matching:
//! - Static routes (`pages/about/page.tsx` → `/about`)
//! - Dynamic segments (`pages/users/[id]/page.tsx` → `/users/:id`)
//! - Nested layouts (`layout.tsx` in any ancestor directory)
//! - API routes with exported method detection (`api/users/route.ts` → `/api/users`)
//!
//! ## Ordering
//!
//! A [`RouteTable`] puts every route without parameters before every route
//! with parameters, then orders by the byte order of the rendered pattern.
//! Matching walks the table in that order and returns the first hit, so
//! `/users/new` wins over `/users/:id`.
//!
//! ## Path handling
//!
//! Request paths are matched as given. `/about/` does not match `/about`, and
//! parameter values are not percent-decoded.
//!
//! ## Example
//!
//! ```
//! use nohr_router::{RouteEntry, RoutePattern, RouteTable, SourceRef};
//!
//! let table = RouteTable::from_entries(vec![
//!     RouteEntry::page(RoutePattern::from_dir_path("").unwrap(), SourceRef::new("page.tsx"), vec![]),
//!     RouteEntry::page(RoutePattern::from_dir_path("users/[id]").unwrap(), SourceRef::new("users/[id]/page.tsx"), vec![]),
//! ]);
//!
//! let hit = table.match_path("/users/123").unwrap();
//! assert_eq!(hit.params.get("id"), Some(&"123".to_string()));
//! assert_eq!(hit.entry.source.as_str(), "users/[id]/page.tsx");
//! ```

mod builder;
mod discovery;
mod error;
mod layout;
mod manifest;
mod matcher;
mod methods;
mod shared;
mod table;
pub mod path;
pub mod route;

pub use builder::{RouteConventions, RouteTableBuilder};
pub use discovery::{scan, DiscoveredFile};
pub use error::{Result, RouterError};
pub use layout::LayoutIndex;
pub use manifest::{CacheStatus, ManifestCache, RouteManifest, DEFAULT_MANIFEST_PATH};
pub use matcher::{match_path, MatchResult};
pub use methods::{detect_exported_methods, HttpMethod, UnknownMethod};
pub use route::{PatternError, RoutePattern, Segment};
pub use shared::SharedManifest;
pub use table::{RouteEntry, RouteKind, RouteStats, RouteTable, SourceRef};
