//! # apigate
//!
//! **apigate** is a single-entry HTTP gateway built on the `may` coroutine
//! runtime. Every request passes through one dispatch pipeline that builds a
//! request context, resolves a handler, invokes it and writes exactly one
//! response stamped with the service identity.
//!
//! ## Architecture
//!
//! - **[`gateway`]** - the front controller and its process-wide instance
//! - **[`context`]** - per-request state, charset negotiation and the outbound response
//! - **[`registry`]** - handler lookup by method and path
//! - **[`invoker`]** - calls the resolved handler, isolating errors and panics
//! - **[`handler`]** - handler descriptors and the request view they receive
//! - **[`server`]** - `may_minihttp` glue: request parsing, response sinks, listener
//! - **[`config`]** / **[`logging`]** - start-up configuration and tracing setup
//! - **[`cli`]** - the `apigate` binary
//!
//! ## Request Flow
//!
//! ```text
//! may_minihttp ──► AppService ──► parse_request ──► Gateway::dispatch
//!                                                       │
//!                            RequestContext ◄───────────┤
//!                            HandlerRegistry::resolve ◄─┤
//!                            Invoker::invoke ◄──────────┤
//!                            Outbound::send ◄───────────┘
//! ```
//!
//! | Condition | Status | Body |
//! |---|---|---|
//! | unsupported declared charset | 415 | `{"error": ...}` |
//! | no handler, `OPTIONS` | 200 | `OK` |
//! | no handler | 404 | `{"error","method","path"}` |
//! | handler error or panic | 500 | `{"error":"Internal Server Error"}` |
//! | handler success | 200 | handler result as JSON |
//!
//! ## Quick Start
//!
//! ```rust
//! use apigate::context::ServiceIdentity;
//! use apigate::gateway::Gateway;
//! use apigate::registry::RouteTable;
//! use apigate::server::{BufferedResponse, RawRequest};
//! use http::Method;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! table
//!     .register(Method::GET, "/ping", "ping", |_req| Ok(json!("pong")))
//!     .unwrap();
//!
//! let gateway = Gateway::with_registry(Arc::new(table), ServiceIdentity::new("node-1", "demo").unwrap());
//! let mut res = BufferedResponse::new();
//! gateway.dispatch(RawRequest::new("GET", "/ping"), &mut res);
//!
//! assert_eq!(res.status, Some(200));
//! assert_eq!(res.body_text(), "\"pong\"");
//! assert_eq!(res.header_value("X-Module-Name"), Some("demo"));
//! ```

pub mod builtin;
pub mod cli;
pub mod config;
pub mod context;
pub mod gateway;
pub mod handler;
pub mod ids;
pub mod invoker;
pub mod logging;
pub mod registry;
pub mod server;

pub use context::{RequestContext, ServiceIdentity};
pub use gateway::{Gateway, Outcome};
pub use handler::{Handler, HandlerRequest, HandlerResult};
pub use invoker::{DirectInvoker, InvokeError, Invoker};
pub use registry::{HandlerRegistry, RouteTable};
