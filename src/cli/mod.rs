//! # CLI Module
//!
//! Command-line entry point for the `apigate` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Start the gateway with the built-in routes:
//!
//! ```bash
//! apigate serve --config apigate.yaml --port 9090
//! ```
//!
//! Options:
//! - `--config <FILE>` - YAML configuration file (optional)
//! - `--host <HOST>` - Override `server.host`
//! - `--port <PORT>` - Override `server.port`
//! - `--workers <N>` - Override `runtime.workers`
//!
//! Flags win over `APIGATE_*` environment variables, which win over the file.
//!
//! ### `check-config`
//!
//! Validate a configuration file and print the effective settings:
//!
//! ```bash
//! apigate check-config --config apigate.yaml
//! ```
//!
//! ### `routes`
//!
//! List the routes the gateway serves:
//!
//! ```bash
//! apigate routes
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use apigate::cli::{Cli, run_cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{format_routes, resolve_config, route_table, run_cli, Cli, Commands};
