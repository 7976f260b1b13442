//! Transport glue between `may_minihttp` and the [`Gateway`](crate::gateway::Gateway).
//!
//! - [`request`] reads a `may_minihttp::Request` into a [`RawRequest`]
//! - [`response`] defines the [`ResponseSink`] the gateway writes to
//! - [`service`] is the `HttpService` that calls `Gateway::dispatch`
//! - [`http_server`] starts and stops the listener

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_request, RawRequest};
pub use response::{BufferedResponse, ResponseSink};
pub use service::AppService;
