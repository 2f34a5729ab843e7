//! Hierarchical route patterns.
//!
//! A requested route such as `/companias/123/editar` is expanded into an
//! ordered sequence of patterns, most specific first:
//!
//! ```text
//! companias/123/editar
//! companias/123/%
//! companias/%
//! %
//! ```
//!
//! `%` stands for "any suffix". The sequence is produced lazily by
//! [`RoutePatterns`] so a resolver can stop at the first pattern that
//! yields a match.
//!
//! # Usage
//!
//! ```
//! use segura_authz::matcher::{RoutePattern, route_patterns};
//!
//! let patterns: Vec<String> = route_patterns("/companias/123")
//!     .map(|p| p.to_string())
//!     .collect();
//! assert_eq!(patterns, ["companias/123", "companias/%", "%"]);
//!
//! assert!(RoutePattern::parse("companias/%").matches("/companias/9/ver"));
//! ```

use std::fmt;

/// The wildcard token: any (possibly empty) suffix.
pub const WILDCARD: &str = "%";

/// Splits a route on `/` and drops empty segments.
#[must_use]
pub fn route_segments(route: &str) -> Vec<&str> {
    route
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Canonical form of a route: segments joined by `/`, no outer slashes.
#[must_use]
pub fn normalize_route(route: &str) -> String {
    route_segments(route).join("/")
}

// =============================================================================
// Route Pattern
// =============================================================================

/// One candidate pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutePattern {
    /// The full normalised route, no wildcard.
    Exact(String),
    /// A normalised prefix followed by `/%`.
    Prefix(String),
    /// `%`: matches every route.
    Any,
}

impl RoutePattern {
    /// Parses the textual form produced by `Display`.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let trimmed = pattern.trim();
        if trimmed == WILDCARD {
            return Self::Any;
        }
        match trimmed.strip_suffix("/%") {
            Some(prefix) => Self::Prefix(normalize_route(prefix)),
            None => Self::Exact(normalize_route(trimmed)),
        }
    }

    /// Returns `true` if a stored route is covered by this pattern.
    ///
    /// The stored route is normalised first, so `/companias` and
    /// `companias/` are the same route. A prefix pattern covers the prefix
    /// itself and anything below it. Comparison is case-sensitive.
    #[must_use]
    pub fn matches(&self, stored_route: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(route) => normalize_route(stored_route) == *route,
            Self::Prefix(prefix) => {
                let stored = normalize_route(stored_route);
                stored == *prefix
                    || stored
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }

    /// Returns `true` for the fully generic pattern.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(route) => f.write_str(route),
            Self::Prefix(prefix) => write!(f, "{prefix}/{WILDCARD}"),
            Self::Any => f.write_str(WILDCARD),
        }
    }
}

// =============================================================================
// Pattern Sequence
// =============================================================================

/// Lazily yields the patterns for a route, most specific first.
///
/// Never empty: the last item is always [`RoutePattern::Any`].
#[derive(Debug, Clone)]
pub struct RoutePatterns<'a> {
    segments: Vec<&'a str>,
    // Number of leading segments in the next pattern; 0 means `%` is next.
    next_len: usize,
    done: bool,
}

impl<'a> RoutePatterns<'a> {
    /// Builds the sequence for `route`.
    #[must_use]
    pub fn new(route: &'a str) -> Self {
        let segments = route_segments(route);
        let next_len = segments.len();
        Self {
            segments,
            next_len,
            done: false,
        }
    }
}

impl Iterator for RoutePatterns<'_> {
    type Item = RoutePattern;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.next_len == 0 {
            self.done = true;
            return Some(RoutePattern::Any);
        }

        let len = self.next_len;
        self.next_len -= 1;
        let joined = self.segments[..len].join("/");
        if len == self.segments.len() {
            Some(RoutePattern::Exact(joined))
        } else {
            Some(RoutePattern::Prefix(joined))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done { 0 } else { self.next_len + 1 };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RoutePatterns<'_> {}

/// Returns the candidate patterns for `route`, most specific first.
#[must_use]
pub fn route_patterns(route: &str) -> RoutePatterns<'_> {
    RoutePatterns::new(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(route: &str) -> Vec<String> {
        route_patterns(route).map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_patterns_most_specific_first() {
        assert_eq!(
            rendered("/companias/123/editar"),
            ["companias/123/editar", "companias/123/%", "companias/%", "%"]
        );
    }

    #[test]
    fn test_single_segment() {
        assert_eq!(rendered("/usuarios"), ["usuarios", "%"]);
    }

    #[test]
    fn test_empty_route_yields_only_wildcard() {
        assert_eq!(rendered(""), ["%"]);
        assert_eq!(rendered("/"), ["%"]);
        assert_eq!(rendered("  //  "), ["%"]);
    }

    #[test]
    fn test_duplicate_slashes_are_ignored() {
        assert_eq!(rendered("//leads///42/"), ["leads/42", "leads/%", "%"]);
    }

    #[test]
    fn test_size_hint_is_exact() {
        let mut patterns = route_patterns("/a/b/c");
        assert_eq!(patterns.len(), 4);
        patterns.next();
        assert_eq!(patterns.len(), 3);
        let _ = patterns.by_ref().count();
        assert_eq!(patterns.len(), 0);
        assert!(patterns.next().is_none());
    }

    #[test]
    fn test_exact_pattern_matches_normalised_route() {
        let pattern = RoutePattern::parse("companias/123/editar");
        assert!(pattern.matches("/companias/123/editar"));
        assert!(pattern.matches("companias/123/editar/"));
        assert!(!pattern.matches("/companias/123"));
        assert!(!pattern.matches("/Companias/123/editar"));
    }

    #[test]
    fn test_prefix_pattern_covers_prefix_and_descendants() {
        let pattern = RoutePattern::parse("companias/%");
        assert!(pattern.matches("/companias"));
        assert!(pattern.matches("/companias/456"));
        assert!(pattern.matches("/companias/123/editar"));
        assert!(!pattern.matches("/companiasx"));
        assert!(!pattern.matches("/leads"));
    }

    #[test]
    fn test_any_matches_everything() {
        let pattern = RoutePattern::parse("%");
        assert!(pattern.is_generic());
        assert!(pattern.matches("/anything/at/all"));
        assert!(pattern.matches(""));
    }

    #[test]
    fn test_parse_display_agree() {
        for text in ["companias/123/editar", "companias/%", "%"] {
            assert_eq!(RoutePattern::parse(text).to_string(), text);
        }
    }
}
