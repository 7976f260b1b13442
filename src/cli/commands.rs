use crate::builtin::register_builtin;
use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::logging::{init_logging, LogConfig};
use crate::registry::RouteTable;
use crate::server::{AppService, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Command-line interface for apigate
#[derive(Parser)]
#[command(name = "apigate")]
#[command(about = "Single-entry HTTP gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway until the server exits
    Serve {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to bind, overrides `server.host`
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides `server.port`
        #[arg(short, long)]
        port: Option<u16>,

        /// Coroutine worker threads, overrides `runtime.workers`
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Validate a configuration file and print the effective settings
    CheckConfig {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the route table
    Routes,
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - The configuration cannot be read, parsed or fails validation
/// - Logging is already initialized
/// - The server fails to bind or its coroutine panics
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            workers,
        } => {
            init_logging(&LogConfig::from_env())?;
            let config = resolve_config(config.as_deref(), host, port, workers)?;
            config.runtime.apply();

            let table = route_table()?;
            let identity = config.identity.to_identity()?;
            let gateway = Gateway::get_or_init(|| {
                Gateway::with_registry(Arc::new(table), identity)
            });

            let handle = HttpServer(AppService::new(gateway)).start(config.bind_addr())?;
            info!(
                addr = %handle.addr(),
                workers = config.runtime.workers,
                stack_size = config.runtime.stack_size,
                "apigate serving"
            );
            handle
                .join()
                .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
        }
        Commands::CheckConfig { config } => {
            let config = resolve_config(Some(&config), None, None, None)?;
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Commands::Routes => {
            print!("{}", format_routes(&route_table()?));
            Ok(())
        }
    }
}

/// Layer file, environment and flag settings, then validate the result.
pub fn resolve_config(
    path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    workers: Option<usize>,
) -> anyhow::Result<GatewayConfig> {
    let mut config = match path {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    config.apply_env();
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(workers) = workers {
        config.runtime.workers = workers;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Route table with the built-in handlers registered.
pub fn route_table() -> anyhow::Result<RouteTable> {
    let mut table = RouteTable::new();
    register_builtin(&mut table).context("failed to register built-in routes")?;
    Ok(table)
}

/// One `METHOD pattern name` line per registered handler.
#[must_use]
pub fn format_routes(table: &RouteTable) -> String {
    table
        .handlers()
        .iter()
        .map(|h| format!("{:<8}{:<24}{}\n", h.method().as_str(), h.pattern(), h.name()))
        .collect()
}
