//! # Handler Registry
//!
//! The gateway asks a [`HandlerRegistry`] for the handler bound to a
//! `(method, path)` pair. [`RouteTable`] is the registry shipped with the
//! crate: handlers are registered at start-up and looked up through a radix
//! tree keyed on path segments.
//!
//! ## Matching rules
//!
//! - Paths are split on `/`; empty segments are ignored, so `/a//b/` matches `/a/b`
//! - Static segments (`users`) are tried before parameter segments (`{id}`)
//! - Parameter segments match any single segment and are captured by name
//! - A leaf stores at most one handler per HTTP method
//!
//! ```rust
//! use apigate::registry::{HandlerRegistry, RouteTable};
//! use http::Method;
//! use serde_json::json;
//!
//! let mut table = RouteTable::new();
//! table
//!     .register(Method::GET, "/users/{id}", "get_user", |req| {
//!         Ok(json!({ "id": req.get_path_param("id") }))
//!     })
//!     .unwrap();
//!
//! let found = table.resolve(&Method::GET, "/users/42").unwrap();
//! assert_eq!(found.handler.name(), "get_user");
//! assert_eq!(found.get_path_param("id"), Some("42"));
//! assert!(table.resolve(&Method::POST, "/users/42").is_none());
//! ```

use crate::handler::{Handler, HandlerRequest, HandlerResult, ParamVec, RouteMatch};
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lookup contract the gateway depends on.
///
/// Implementations must be deterministic and free of side effects visible to
/// the gateway. `None` is an expected outcome, not an error.
pub trait HandlerRegistry: Send + Sync {
    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch>;
}

/// Reasons a route pattern is refused at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The pattern does not start with `/`.
    NotAbsolute { pattern: String },
    /// A `{}` segment has no parameter name, or braces are unbalanced.
    BadParameter { pattern: String, segment: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotAbsolute { pattern } => {
                write!(f, "route pattern '{pattern}' must start with '/'")
            }
            RegistryError::BadParameter { pattern, segment } => {
                write!(
                    f,
                    "route pattern '{pattern}' has an invalid parameter segment '{segment}'"
                )
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Node in the route tree. Each node is one path segment.
#[derive(Clone, Default)]
struct RouteNode {
    segment: String,
    param_name: Option<Arc<str>>,
    handlers: HashMap<Method, Handler>,
    children: Vec<RouteNode>,
    param_children: Vec<RouteNode>,
}

impl RouteNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            ..Self::default()
        }
    }

    fn new_param(param_name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(param_name)),
            ..Self::default()
        }
    }

    /// Insert a handler, returning the one it replaced.
    fn insert(&mut self, segments: &[&str], handler: Handler) -> Option<Handler> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.handlers.insert(handler.method().clone(), handler);
        };

        if let Some(param_name) = param_name(segment) {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(param_name))
            {
                return child.insert(remaining, handler);
            }
            let mut child = RouteNode::new_param(param_name);
            let replaced = child.insert(remaining, handler);
            self.param_children.push(child);
            return replaced;
        }

        if let Some(child) = self.children.iter_mut().find(|c| c.segment == *segment) {
            return child.insert(remaining, handler);
        }
        let mut child = RouteNode::new(segment);
        let replaced = child.insert(remaining, handler);
        self.children.push(child);
        replaced
    }

    fn search(&self, segments: &[&str], method: &Method, params: &mut ParamVec) -> Option<Handler> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.handlers.get(method).cloned();
        };

        for child in &self.children {
            if child.segment == *segment {
                if let Some(found) = child.search(remaining, method, params) {
                    return Some(found);
                }
            }
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), (*segment).to_string()));
                if let Some(found) = child.search(remaining, method, params) {
                    return Some(found);
                }
                // Backtrack
                params.pop();
            }
        }

        None
    }

    fn collect(&self, out: &mut Vec<Handler>) {
        out.extend(self.handlers.values().cloned());
        for child in self.children.iter().chain(&self.param_children) {
            child.collect(out);
        }
    }
}

fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Radix-tree [`HandlerRegistry`] built at start-up.
#[derive(Clone, Default)]
pub struct RouteTable {
    root: RouteNode,
    len: usize,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler function for `method` on `pattern`.
    ///
    /// Registering the same method and pattern twice replaces the earlier
    /// handler.
    pub fn register<F>(
        &mut self,
        method: Method,
        pattern: &str,
        name: &str,
        target: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&HandlerRequest<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Handler::new(name, method, pattern, target))
    }

    /// Add a prebuilt handler descriptor.
    pub fn add(&mut self, handler: Handler) -> Result<(), RegistryError> {
        let pattern = handler.pattern().to_string();
        if !pattern.starts_with('/') {
            return Err(RegistryError::NotAbsolute { pattern });
        }
        let segments = split_path(&pattern);
        if let Some(bad) = segments.iter().find(|s| {
            let braced = s.starts_with('{') || s.ends_with('}');
            braced && param_name(s).map_or(true, |n| n.is_empty() || n.contains(['{', '}']))
        }) {
            return Err(RegistryError::BadParameter {
                segment: (*bad).to_string(),
                pattern,
            });
        }

        let name = handler.name().to_string();
        let method = handler.method().clone();
        match self.root.insert(&segments, handler) {
            Some(old) => {
                warn!(
                    handler_name = %name,
                    replaced = %old.name(),
                    method = %method,
                    pattern = %pattern,
                    "Replaced existing handler"
                );
            }
            None => {
                self.len += 1;
                info!(
                    handler_name = %name,
                    method = %method,
                    pattern = %pattern,
                    total_handlers = self.len,
                    "Handler registered successfully"
                );
            }
        }
        Ok(())
    }

    /// Number of registered `(method, pattern)` pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All registered handlers, sorted by pattern then method.
    #[must_use]
    pub fn handlers(&self) -> Vec<Handler> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut out);
        out.sort_by(|a, b| {
            (a.pattern(), a.method().as_str()).cmp(&(b.pattern(), b.method().as_str()))
        });
        out
    }
}

impl HandlerRegistry for RouteTable {
    fn resolve(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let segments = split_path(path);
        let mut path_params = ParamVec::new();
        let handler = self.root.search(&segments, method, &mut path_params);
        debug!(
            method = %method,
            path = %path,
            matched = handler.as_ref().map(|h| h.name()),
            "Handler lookup"
        );
        handler.map(|handler| RouteMatch {
            handler,
            path_params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ok(_req: &HandlerRequest<'_>) -> HandlerResult {
        Ok(json!(null))
    }

    fn table() -> RouteTable {
        let mut t = RouteTable::new();
        t.register(Method::GET, "/", "root", ok).unwrap();
        t.register(Method::GET, "/users", "list_users", ok).unwrap();
        t.register(Method::GET, "/users/me", "current_user", ok).unwrap();
        t.register(Method::GET, "/users/{id}", "get_user", ok).unwrap();
        t.register(Method::DELETE, "/users/{id}", "delete_user", ok).unwrap();
        t.register(Method::GET, "/users/{user_id}/posts/{id}", "get_post", ok)
            .unwrap();
        t
    }

    #[test]
    fn test_static_beats_parameter() {
        let t = table();
        let m = t.resolve(&Method::GET, "/users/me").unwrap();
        assert_eq!(m.handler.name(), "current_user");
        assert!(m.path_params.is_empty());
    }

    #[test]
    fn test_parameters_are_captured() {
        let t = table();
        let m = t.resolve(&Method::GET, "/users/7/posts/99").unwrap();
        assert_eq!(m.handler.name(), "get_post");
        assert_eq!(m.get_path_param("user_id"), Some("7"));
        assert_eq!(m.get_path_param("id"), Some("99"));
    }

    #[test]
    fn test_method_is_part_of_the_key() {
        let t = table();
        assert_eq!(
            t.resolve(&Method::DELETE, "/users/3").unwrap().handler.name(),
            "delete_user"
        );
        assert!(t.resolve(&Method::POST, "/users/3").is_none());
        assert!(t.resolve(&Method::OPTIONS, "/users").is_none());
    }

    #[test]
    fn test_root_and_misses() {
        let t = table();
        assert_eq!(t.resolve(&Method::GET, "/").unwrap().handler.name(), "root");
        assert!(t.resolve(&Method::GET, "/unknown").is_none());
        assert!(t.resolve(&Method::GET, "/users/1/posts").is_none());
    }

    #[test]
    fn test_backtracking_drops_stale_params() {
        let mut t = RouteTable::new();
        t.register(Method::GET, "/{a}/x", "ax", ok).unwrap();
        t.register(Method::GET, "/{b}/y", "by", ok).unwrap();
        let m = t.resolve(&Method::GET, "/1/y").unwrap();
        assert_eq!(m.handler.name(), "by");
        assert_eq!(m.path_params.len(), 1);
        assert_eq!(m.get_path_param("b"), Some("1"));
    }

    #[test]
    fn test_reregistering_replaces() {
        let mut t = table();
        let before = t.len();
        t.register(Method::GET, "/users", "list_users_v2", ok).unwrap();
        assert_eq!(t.len(), before);
        assert_eq!(
            t.resolve(&Method::GET, "/users").unwrap().handler.name(),
            "list_users_v2"
        );
    }

    #[test]
    fn test_invalid_patterns() {
        let mut t = RouteTable::new();
        assert!(matches!(
            t.register(Method::GET, "users", "x", ok),
            Err(RegistryError::NotAbsolute { .. })
        ));
        assert!(matches!(
            t.register(Method::GET, "/users/{}", "x", ok),
            Err(RegistryError::BadParameter { .. })
        ));
        assert!(matches!(
            t.register(Method::GET, "/users/{id", "x", ok),
            Err(RegistryError::BadParameter { .. })
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn test_handlers_listing_is_sorted() {
        let t = table();
        let names: Vec<String> = t.handlers().iter().map(|h| h.name().to_string()).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "root");
        assert_eq!(names[1], "list_users");
    }
}
