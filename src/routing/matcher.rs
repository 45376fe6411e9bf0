//! Path and method matching.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries
//! - Match request methods against a route's allow-list
//!
//! # Design Decisions
//! - `/api` matches `/api` and `/api/x` but not `/apix`
//! - Prefix lists used by the security stages compare case-insensitively
//!   against the normalized path, never the raw one
//! - No regex to guarantee O(n) matching

use axum::http::{Method, Request};
use percent_encoding::percent_decode_str;

/// Returns true if `path` starts with `prefix` on a segment boundary,
/// ignoring ASCII case.
pub fn has_path_prefix(path: &str, prefix: &str) -> bool {
    let (path, prefix) = (path.as_bytes(), prefix.as_bytes());
    if path.len() < prefix.len() || !path[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return false;
    }
    prefix.last() == Some(&b'/') || path.len() == prefix.len() || path[prefix.len()] == b'/'
}

/// Returns true if `path` matches any prefix in the list.
pub fn matches_any_prefix<S: AsRef<str>>(path: &str, prefixes: &[S]) -> bool {
    prefixes.iter().any(|p| has_path_prefix(path, p.as_ref()))
}

/// Percent-decode `path` and resolve `.` and `..` segments.
///
/// Empty segments collapse and a backslash counts as a separator, so
/// `/health/../api/x` and `/health/%2e%2e//api/x` both become `/api/x`.
/// `..` never climbs above the root. A trailing slash is kept.
pub fn normalize_path(path: &str) -> String {
    let decoded = percent_decode_str(path).decode_utf8_lossy();

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = String::with_capacity(decoded.len());
    for segment in &segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() || (decoded.ends_with('/') && !segments.is_empty()) {
        normalized.push('/');
    }
    normalized
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        has_path_prefix(req.uri().path(), &self.prefix)
    }
}

/// Matches the request method. An empty list accepts any method.
#[derive(Debug, Clone, Default)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    /// Build from method names. Unparseable names are ignored.
    pub fn new<S: AsRef<str>>(methods: &[S]) -> Self {
        Self {
            methods: methods
                .iter()
                .filter_map(|m| Method::from_bytes(m.as_ref().to_ascii_uppercase().as_bytes()).ok())
                .collect(),
        }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.methods.is_empty() || self.methods.contains(req.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_prefix_segment_boundaries() {
        assert!(has_path_prefix("/api", "/api"));
        assert!(has_path_prefix("/api/users", "/api"));
        assert!(has_path_prefix("/API/users", "/api"));
        assert!(!has_path_prefix("/apix", "/api"));
        assert!(!has_path_prefix("/ap", "/api"));
        assert!(has_path_prefix("/anything", "/"));
        assert!(has_path_prefix("/api/v1/x", "/api/v1/"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/users"), "/api/users");
        assert_eq!(normalize_path("/health/../api/x"), "/api/x");
        assert_eq!(normalize_path("/health/%2e%2e/api/x"), "/api/x");
        assert_eq!(normalize_path("/health/..%2Fapi"), "/api");
        assert_eq!(normalize_path("/health/.\\..\\api"), "/api");
        assert_eq!(normalize_path("//health/./status"), "/health/status");
        assert_eq!(normalize_path("/../../etc"), "/etc");
        assert_eq!(normalize_path("/api/v1/"), "/api/v1/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_dot_segments_escape_prefix() {
        assert!(has_path_prefix("/health/../api/x", "/health"));
        assert!(!has_path_prefix(&normalize_path("/health/../api/x"), "/health"));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api");

        let req1 = Request::builder()
            .uri("http://example.com/api/v1")
            .body(Body::default())
            .unwrap();
        assert!(matcher.matches(&req1));

        let req2 = Request::builder()
            .uri("http://example.com/images")
            .body(Body::default())
            .unwrap();
        assert!(!matcher.matches(&req2));
    }

    #[test]
    fn test_method_matcher() {
        let matcher = MethodMatcher::new(&["get", "POST"]);
        let get = Request::get("/").body(()).unwrap();
        let delete = Request::delete("/").body(()).unwrap();
        assert!(matcher.matches(&get));
        assert!(!matcher.matches(&delete));
        assert!(MethodMatcher::default().matches(&delete));
    }
}
