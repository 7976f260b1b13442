//! # Gateway Module
//!
//! The gateway is the single entry point for every HTTP request. It builds a
//! [`RequestContext`](crate::context::RequestContext), resolves a handler,
//! invokes it and writes back exactly one response.
//!
//! ## Request Flow
//!
//! ```text
//! RawRequest ──► RequestContext::build ──┬─ error ──► 415 / 400 fallback
//!                                         │
//!                                         ▼
//!                         HandlerRegistry::resolve
//!                    ┌────────────┼─────────────────┐
//!             none + OPTIONS    none            Some(route)
//!                    │            │                  │
//!                 200 "OK"       404        Invoker::invoke
//!                                            ┌───────┴───────┐
//!                                           Err              Ok
//!                                            │               │
//!                                           500        200 + JSON body
//! ```
//!
//! ## Error Handling
//!
//! - Handler errors and panics become `500`; the message is logged with the
//!   handler name and never written to the body
//! - An unmatched `OPTIONS` request always gets `200 OK` with body `OK`, ahead
//!   of the not-found rule
//! - A request whose charset cannot be decoded gets a `415` fallback instead of
//!   being left without a response
//!
//! ## Singleton
//!
//! [`Gateway::get_or_init`] builds the process-wide instance on first use.
//! Tests and embedders can also construct private gateways with
//! [`Gateway::new`].

mod core;
pub mod outcome;

pub use core::Gateway;
pub use outcome::Outcome;
