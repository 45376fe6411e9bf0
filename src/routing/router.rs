//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for request
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Higher priority first, then longer prefix first

use axum::http::Request;

use crate::config::RouteConfig;
use crate::routing::matcher::{MethodMatcher, PathPrefixMatcher};

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub id: String,
    pub cluster: String,
    pub priority: u32,
    path: PathPrefixMatcher,
    methods: MethodMatcher,
}

impl Route {
    pub fn from_config(config: &RouteConfig) -> Self {
        Self {
            id: config.id.clone(),
            cluster: config.cluster.clone(),
            priority: config.priority,
            path: PathPrefixMatcher::new(config.path_prefix.clone()),
            methods: MethodMatcher::new(config.methods.as_slice()),
        }
    }

    pub fn path_prefix(&self) -> &str {
        self.path.prefix()
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.methods().iter().map(|m| m.to_string()).collect()
    }

    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.path.matches(req) && self.methods.matches(req)
    }
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = configs.iter().map(Route::from_config).collect();
        routes.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.path_prefix().len().cmp(&a.path_prefix().len()))
        });
        Self { routes }
    }

    /// First matching route, if any.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(req))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(id: &str, prefix: &str, methods: &[&str], priority: u32) -> RouteConfig {
        RouteConfig {
            id: id.into(),
            cluster: format!("{id}-cluster"),
            path_prefix: prefix.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            priority,
        }
    }

    fn get(path: &str) -> Request<()> {
        Request::get(path).body(()).unwrap()
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RouteTable::from_config(&[route("root", "/", &[], 0), route("api", "/api", &[], 0)]);
        assert_eq!(table.match_request(&get("/api/users")).unwrap().id, "api");
        assert_eq!(table.match_request(&get("/apix")).unwrap().id, "root");
    }

    #[test]
    fn test_priority_beats_length() {
        let table = RouteTable::from_config(&[
            route("api", "/api/v1", &[], 0),
            route("catchall", "/", &[], 10),
        ]);
        assert_eq!(table.match_request(&get("/api/v1/x")).unwrap().id, "catchall");
    }

    #[test]
    fn test_method_filter() {
        let table = RouteTable::from_config(&[route("write", "/items", &["post"], 0)]);
        assert!(table.match_request(&get("/items")).is_none());

        let post = Request::post("/items").body(()).unwrap();
        assert_eq!(table.match_request(&post).unwrap().id, "write");
    }
}
