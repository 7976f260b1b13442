//! Handler descriptors and the request view handlers receive.

use crate::context::RequestContext;
use crate::ids::RequestId;
use crate::server::request::{HeaderVec, ParamMap};
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Path parameters captured while resolving a route, in path order.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What a handler returns: a JSON value, or any error.
pub type HandlerResult = anyhow::Result<Value>;

/// Signature of a registered handler function.
pub type HandlerFn = dyn Fn(&HandlerRequest<'_>) -> HandlerResult + Send + Sync;

/// A registered unit of request-handling logic.
///
/// Cloning is cheap; the name, pattern and target are shared.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    method: Method,
    pattern: Arc<str>,
    target: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(name: &str, method: Method, pattern: &str, target: F) -> Self
    where
        F: Fn(&HandlerRequest<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            method,
            pattern: Arc::from(pattern),
            target: Arc::new(target),
        }
    }

    /// Identifying name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub(crate) fn target(&self) -> &HandlerFn {
        self.target.as_ref()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Result of a successful registry lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub handler: Handler,
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics: if the same name appears at two path
    /// depths, the deeper one is returned.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Borrowed view of a request handed to a handler function.
#[derive(Debug, Clone, Copy)]
pub struct HandlerRequest<'r> {
    pub request_id: RequestId,
    pub handler_name: &'r str,
    pub method: &'r Method,
    pub path: &'r str,
    pub body: Option<&'r Value>,
    /// Body bytes as received, also set when no JSON or form body was decoded.
    pub raw_body: &'r [u8],
    params: &'r ParamMap,
    path_params: &'r ParamVec,
    headers: &'r HeaderVec,
}

impl<'r> HandlerRequest<'r> {
    pub fn new(ctx: &'r RequestContext<'_>, route: &'r RouteMatch) -> Self {
        Self {
            request_id: ctx.request_id(),
            handler_name: route.handler.name(),
            method: ctx.method(),
            path: ctx.path(),
            body: ctx.body(),
            raw_body: ctx.raw_body(),
            params: ctx.params(),
            path_params: &route.path_params,
            headers: ctx.headers(),
        }
    }

    /// Get a path parameter by name
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&'r str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query or form parameter by name
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&'r str> {
        self.params.get(name).map(String::as_str)
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&'r str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &'r ParamMap {
        self.params
    }

    #[must_use]
    pub fn path_params(&self) -> &'r ParamVec {
        self.path_params
    }
}
