//! Handlers every gateway ships with.
//!
//! - `GET /health` answers `{"status":"ok"}`
//! - `GET /echo` and `POST /echo` reflect the request back as JSON

use crate::handler::{HandlerRequest, HandlerResult};
use crate::registry::{RegistryError, RouteTable};
use http::Method;
use serde_json::{json, Map, Value};

pub fn health_handler(_req: &HandlerRequest<'_>) -> HandlerResult {
    Ok(json!({ "status": "ok" }))
}

/// Echoes back what the gateway parsed out of the request.
pub fn echo_handler(req: &HandlerRequest<'_>) -> HandlerResult {
    let params: Map<String, Value> = req
        .params()
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Ok(json!({
        "handler": req.handler_name,
        "request_id": req.request_id.to_string(),
        "method": req.method.as_str(),
        "path": req.path,
        "params": params,
        "body": req.body.cloned().unwrap_or(Value::Null),
    }))
}

/// Register the built-in routes on `table`.
pub fn register_builtin(table: &mut RouteTable) -> Result<(), RegistryError> {
    table.register(Method::GET, "/health", "health", health_handler)?;
    table.register(Method::GET, "/echo", "echo", echo_handler)?;
    table.register(Method::POST, "/echo", "echo", echo_handler)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandlerRegistry;

    #[test]
    fn test_builtin_routes_registered() {
        let mut table = RouteTable::new();
        register_builtin(&mut table).unwrap();
        assert_eq!(table.len(), 3);
        assert!(table.resolve(&Method::GET, "/health").is_some());
        assert!(table.resolve(&Method::POST, "/echo").is_some());
        assert!(table.resolve(&Method::POST, "/health").is_none());
    }
}
