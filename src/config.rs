//! # Configuration
//!
//! Gateway settings come from three layers, later layers winning:
//!
//! 1. built-in defaults
//! 2. a YAML file passed with `--config`
//! 3. `APIGATE_*` environment variables
//!
//! Command-line flags of `apigate serve` are applied on top by the CLI.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! runtime:
//!   workers: 4
//!   stack_size: 0x8000
//! identity:
//!   server_id: orders-1
//!   module_name: orders
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `APIGATE_HOST` | `server.host` |
//! | `APIGATE_PORT` | `server.port` |
//! | `APIGATE_WORKERS` | `runtime.workers` |
//! | `APIGATE_STACK_SIZE` | `runtime.stack_size` (decimal or `0x` hex) |
//! | `APIGATE_SERVER_ID` | `identity.server_id` |
//! | `APIGATE_MODULE_NAME` | `identity.module_name` |
//!
//! Unparseable numeric values are ignored with a warning.

use crate::context::ServiceIdentity;
use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Smallest coroutine stack accepted by [`GatewayConfig::validate`].
pub const MIN_STACK_SIZE: usize = 0x1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Coroutine runtime settings applied to `may` before the server starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads driving coroutines
    pub workers: usize,
    /// Stack size for each request coroutine in bytes
    #[serde(deserialize_with = "deserialize_size")]
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            stack_size: 0x8000,
        }
    }
}

impl RuntimeConfig {
    /// Configure the global `may` runtime.
    ///
    /// Must run before the first coroutine is spawned to take effect.
    pub fn apply(&self) {
        may::config()
            .set_workers(self.workers)
            .set_stack_size(self.stack_size);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub server_id: String,
    pub module_name: String,
    pub server_id_header: String,
    pub module_name_header: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            server_id: format!("apigate-{}", std::process::id()),
            module_name: "apigate".to_string(),
            server_id_header: ServiceIdentity::DEFAULT_SERVER_ID_HEADER.to_string(),
            module_name_header: ServiceIdentity::DEFAULT_MODULE_NAME_HEADER.to_string(),
        }
    }
}

impl IdentityConfig {
    /// Render the identity headers stamped on every response.
    pub fn to_identity(&self) -> Result<ServiceIdentity, ConfigError> {
        ServiceIdentity::with_headers(
            &self.server_id_header,
            &self.server_id,
            &self.module_name_header,
            &self.module_name,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    pub identity: IdentityConfig,
}

/// A setting that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPort,
    NoWorkers,
    StackTooSmall { stack_size: usize },
    EmptyValue { field: &'static str },
    InvalidHeaderName { field: &'static str, value: String },
    InvalidHeaderValue { field: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "server.port must be between 1 and 65535"),
            ConfigError::NoWorkers => write!(f, "runtime.workers must be at least 1"),
            ConfigError::StackTooSmall { stack_size } => write!(
                f,
                "runtime.stack_size {stack_size:#x} is below the minimum of {MIN_STACK_SIZE:#x}"
            ),
            ConfigError::EmptyValue { field } => write!(f, "{field} must not be empty"),
            ConfigError::InvalidHeaderName { field, value } => {
                write!(f, "{field} '{value}' is not a valid HTTP header name")
            }
            ConfigError::InvalidHeaderValue { field } => {
                write!(f, "{field} contains characters not allowed in a header value")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl GatewayConfig {
    /// Load from a YAML file. Sections and fields left out take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        };
        Ok(config)
    }

    /// Apply `APIGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("APIGATE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_var(&lookup, "APIGATE_PORT", |v| v.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(workers) = parse_var(&lookup, "APIGATE_WORKERS", |v| v.parse::<usize>().ok()) {
            self.runtime.workers = workers;
        }
        if let Some(size) = parse_var(&lookup, "APIGATE_STACK_SIZE", parse_size) {
            self.runtime.stack_size = size;
        }
        if let Some(id) = lookup("APIGATE_SERVER_ID") {
            self.identity.server_id = id;
        }
        if let Some(name) = lookup("APIGATE_MODULE_NAME") {
            self.identity.module_name = name;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyValue { field: "server.host" });
        }
        if self.runtime.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.runtime.stack_size < MIN_STACK_SIZE {
            return Err(ConfigError::StackTooSmall {
                stack_size: self.runtime.stack_size,
            });
        }
        let id = &self.identity;
        check_header_name("identity.server_id_header", &id.server_id_header)?;
        check_header_name("identity.module_name_header", &id.module_name_header)?;
        check_header_value("identity.server_id", &id.server_id)?;
        check_header_value("identity.module_name", &id.module_name)?;
        Ok(())
    }

    /// `host:port` string for binding the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<F, T, P>(lookup: &F, key: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let raw = lookup(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(key = key, value = %raw, "Ignoring unparseable environment override");
    }
    parsed
}

/// Parse a byte size given in decimal or `0x` hexadecimal.
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        usize::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

fn deserialize_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(usize),
        Text(String),
    }
    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => parse_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid size '{s}'"))),
    }
}

pub(crate) fn check_header_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::EmptyValue { field });
    }
    if http::header::HeaderName::from_bytes(value.as_bytes()).is_err() {
        return Err(ConfigError::InvalidHeaderName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_header_value(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyValue { field });
    }
    if http::header::HeaderValue::from_str(value).is_err() {
        return Err(ConfigError::InvalidHeaderValue { field });
    }
    Ok(())
}
