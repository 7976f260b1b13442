//! # Invoker
//!
//! An [`Invoker`] runs a resolved handler against a request context and
//! reports either the handler's value or an [`InvokeError`]. The gateway never
//! sees a panic: [`DirectInvoker`] catches unwinding handlers and reports them
//! as [`InvokeError::Panicked`]. Failures are logged by the caller, not here.

use crate::context::RequestContext;
use crate::handler::{HandlerRequest, RouteMatch};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::info;

/// Why an invocation produced no value.
#[derive(Debug)]
pub enum InvokeError {
    /// The handler returned an error.
    Failed {
        handler: String,
        source: anyhow::Error,
    },
    /// The handler panicked.
    Panicked { handler: String, message: String },
}

impl InvokeError {
    #[must_use]
    pub fn handler(&self) -> &str {
        match self {
            InvokeError::Failed { handler, .. } | InvokeError::Panicked { handler, .. } => handler,
        }
    }
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Failed { handler, source } => {
                write!(f, "handler '{handler}' failed: {source:#}")
            }
            InvokeError::Panicked { handler, message } => {
                write!(f, "handler '{handler}' panicked: {message}")
            }
        }
    }
}

impl std::error::Error for InvokeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InvokeError::Failed { source, .. } => Some(&**source),
            InvokeError::Panicked { .. } => None,
        }
    }
}

/// Invocation contract the gateway depends on.
pub trait Invoker: Send + Sync {
    fn invoke(&self, ctx: &RequestContext<'_>, route: &RouteMatch) -> Result<Value, InvokeError>;
}

/// Calls the registered handler function on the current coroutine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectInvoker;

impl Invoker for DirectInvoker {
    fn invoke(&self, ctx: &RequestContext<'_>, route: &RouteMatch) -> Result<Value, InvokeError> {
        let request = HandlerRequest::new(ctx, route);
        let handler_name = route.handler.name();

        info!(
            request_id = %request.request_id,
            handler_name = %handler_name,
            path_params = ?request.path_params(),
            "Handler execution start"
        );
        let started = Instant::now();

        let outcome = catch_unwind(AssertUnwindSafe(|| (route.handler.target())(&request)));

        match outcome {
            Ok(Ok(value)) => {
                info!(
                    request_id = %request.request_id,
                    handler_name = %handler_name,
                    execution_time_ms = started.elapsed().as_millis() as u64,
                    "Handler execution complete"
                );
                Ok(value)
            }
            Ok(Err(source)) => Err(InvokeError::Failed {
                handler: handler_name.to_string(),
                source,
            }),
            Err(panic) => Err(InvokeError::Panicked {
                handler: handler_name.to_string(),
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Outbound, ServiceIdentity};
    use crate::handler::{Handler, ParamVec};
    use crate::server::request::RawRequest;
    use crate::server::response::BufferedResponse;
    use http::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn run(handler: Handler, raw: RawRequest) -> Result<Value, InvokeError> {
        let mut sink = BufferedResponse::new();
        let id = ServiceIdentity::new("test", "test").unwrap();
        let ctx = RequestContext::build(raw, Outbound::new(&mut sink, &id))
            .map_err(|(e, _)| e)
            .unwrap();
        let mut path_params = ParamVec::new();
        path_params.push((Arc::from("id"), "5".to_string()));
        DirectInvoker.invoke(
            &ctx,
            &RouteMatch {
                handler,
                path_params,
            },
        )
    }

    #[test]
    fn test_binds_request_data() {
        let handler = Handler::new("show", Method::GET, "/things/{id}", |req| {
            Ok(json!({
                "id": req.get_path_param("id"),
                "verbose": req.get_param("verbose"),
                "agent": req.get_header("User-Agent"),
            }))
        });
        let raw = RawRequest::new("GET", "/things/5?verbose=1").with_header("user-agent", "curl");
        let value = run(handler, raw).unwrap();
        assert_eq!(value, json!({"id": "5", "verbose": "1", "agent": "curl"}));
    }

    #[test]
    fn test_error_is_reported_with_handler_name() {
        let handler = Handler::new("boom", Method::GET, "/boom", |_| {
            Err(anyhow::anyhow!("db connection refused"))
        });
        let err = run(handler, RawRequest::new("GET", "/boom")).unwrap_err();
        assert_eq!(err.handler(), "boom");
        assert!(matches!(err, InvokeError::Failed { .. }));
        assert!(err.to_string().contains("db connection refused"));
    }

    #[test]
    fn test_panic_is_caught() {
        let handler = Handler::new("explode", Method::GET, "/explode", |_| {
            panic!("index out of range")
        });
        let err = run(handler, RawRequest::new("GET", "/explode")).unwrap_err();
        match err {
            InvokeError::Panicked { handler, message } => {
                assert_eq!(handler, "explode");
                assert_eq!(message, "index out of range");
            }
            other => panic!("expected panic error, got {other}"),
        }
    }
}
