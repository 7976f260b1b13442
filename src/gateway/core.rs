use super::outcome::{self, Outcome, Rendered};
use crate::context::{ContextError, Outbound, RequestContext, ServiceIdentity};
use crate::handler::RouteMatch;
use crate::invoker::{DirectInvoker, InvokeError, Invoker};
use crate::registry::HandlerRegistry;
use crate::server::request::RawRequest;
use crate::server::response::ResponseSink;
use http::Method;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

static INSTANCE: OnceCell<Arc<Gateway>> = OnceCell::new();

/// Front controller for every inbound request.
///
/// Holds only start-up state: the registry, the invoker and the service
/// identity. All per-request state lives in a [`RequestContext`], so one
/// gateway can serve any number of concurrent dispatches.
pub struct Gateway {
    registry: Arc<dyn HandlerRegistry>,
    invoker: Arc<dyn Invoker>,
    identity: ServiceIdentity,
}

impl Gateway {
    pub fn new(
        registry: Arc<dyn HandlerRegistry>,
        invoker: Arc<dyn Invoker>,
        identity: ServiceIdentity,
    ) -> Self {
        Self {
            registry,
            invoker,
            identity,
        }
    }

    /// Gateway using [`DirectInvoker`].
    pub fn with_registry(registry: Arc<dyn HandlerRegistry>, identity: ServiceIdentity) -> Self {
        Self::new(registry, Arc::new(DirectInvoker), identity)
    }

    /// Process-wide gateway, built by the first caller.
    ///
    /// `init` runs at most once even under concurrent first access; every
    /// caller gets the same instance.
    pub fn get_or_init<F>(init: F) -> Arc<Gateway>
    where
        F: FnOnce() -> Gateway,
    {
        Arc::clone(INSTANCE.get_or_init(|| {
            info!("Initializing process-wide gateway");
            Arc::new(init())
        }))
    }

    /// Fallible form of [`Gateway::get_or_init`]. A failed `init` leaves the
    /// slot empty so a later caller may try again.
    pub fn get_or_try_init<F, E>(init: F) -> Result<Arc<Gateway>, E>
    where
        F: FnOnce() -> Result<Gateway, E>,
    {
        INSTANCE
            .get_or_try_init(|| {
                info!("Initializing process-wide gateway");
                init().map(Arc::new)
            })
            .map(Arc::clone)
    }

    /// The process-wide gateway, if one has been built.
    #[must_use]
    pub fn global() -> Option<Arc<Gateway>> {
        INSTANCE.get().map(Arc::clone)
    }

    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Run one request through the pipeline and write exactly one response.
    ///
    /// Never fails: every error is translated into a status code, and the
    /// terminal state is returned for the caller's bookkeeping.
    pub fn dispatch(&self, raw: RawRequest, sink: &mut dyn ResponseSink) -> Outcome {
        let started = Instant::now();
        let outbound = Outbound::new(sink, &self.identity);

        let mut ctx = match RequestContext::build(raw, outbound) {
            Ok(ctx) => ctx,
            Err((err, outbound)) => return self.reject(err, outbound),
        };

        let route = self.registry.resolve(ctx.method(), ctx.path());
        let outcome = match route {
            None if ctx.method() == Method::OPTIONS => preflight(&mut ctx),
            None => {
                let rendered = outcome::not_found(ctx.method().as_str(), ctx.path());
                write(&mut ctx, rendered, Outcome::NotFound)
            }
            Some(route) => self.invoke(&mut ctx, &route),
        };

        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = outcome.status(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Request complete"
        );
        outcome
    }

    fn invoke(&self, ctx: &mut RequestContext<'_>, route: &RouteMatch) -> Outcome {
        info!(
            request_id = %ctx.request_id(),
            handler_name = %route.handler.name(),
            method = %ctx.method(),
            path = %ctx.path(),
            "Request dispatched to handler"
        );

        let value = match self.invoker.invoke(ctx, route) {
            Ok(value) => value,
            Err(e @ InvokeError::Panicked { .. }) => {
                error!(
                    request_id = %ctx.request_id(),
                    handler_name = %e.handler(),
                    error = %e,
                    "Handler panicked - CRITICAL"
                );
                return write(ctx, outcome::server_error(), Outcome::ServerError);
            }
            Err(e) => {
                error!(
                    request_id = %ctx.request_id(),
                    handler_name = %e.handler(),
                    error = %e,
                    "invoke {} failed", route.handler.name()
                );
                return write(ctx, outcome::server_error(), Outcome::ServerError);
            }
        };

        match outcome::success(&value) {
            Ok(rendered) => write(ctx, rendered, Outcome::Success),
            Err(e) => {
                error!(
                    request_id = %ctx.request_id(),
                    handler_name = %route.handler.name(),
                    error = %e,
                    "Handler result could not be serialized"
                );
                write(ctx, outcome::server_error(), Outcome::ServerError)
            }
        }
    }

    fn reject(&self, err: ContextError, mut outbound: Outbound<'_>) -> Outcome {
        error!(error = %err, "create request context failed");
        let rendered = outcome::rejected(&err);
        if let Err(e) = outbound.send(rendered.status, rendered.content_type, rendered.body) {
            error!(error = %e, "Fallback response could not be written");
        }
        Outcome::Rejected(err)
    }
}

fn preflight(ctx: &mut RequestContext<'_>) -> Outcome {
    debug!(
        request_id = %ctx.request_id(),
        path = %ctx.path(),
        "Answering unmatched OPTIONS request"
    );
    let rendered = outcome::preflight();
    match ctx
        .response()
        .send(rendered.status, rendered.content_type, rendered.body)
    {
        Ok(()) => Outcome::Preflight,
        Err(e) => {
            warn!(
                request_id = %ctx.request_id(),
                error = %e,
                "Preflight body write failed"
            );
            write(ctx, outcome::server_error(), Outcome::ServerError)
        }
    }
}

/// Send `rendered` and report `outcome`, or a server error if the write fails.
fn write(ctx: &mut RequestContext<'_>, rendered: Rendered, outcome: Outcome) -> Outcome {
    let status = rendered.status;
    match ctx
        .response()
        .send(status, rendered.content_type, rendered.body)
    {
        Ok(()) => outcome,
        Err(e) => {
            error!(
                request_id = %ctx.request_id(),
                status = status,
                error = %e,
                "Response write failed"
            );
            if status != 500 {
                let fallback = outcome::server_error();
                if ctx
                    .response()
                    .send(fallback.status, fallback.content_type, fallback.body)
                    .is_err()
                {
                    error!(request_id = %ctx.request_id(), "500 response write failed");
                }
            }
            Outcome::ServerError
        }
    }
}
