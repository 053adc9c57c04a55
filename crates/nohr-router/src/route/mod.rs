/// Route module for file-based routing
///
/// Contains the pure pieces of route derivation: segment classification and
/// the typed URL pattern built from a route file's directory.

pub mod pattern;

pub use pattern::{classify_segment, PatternError, RoutePattern, Segment};
