use crate::constants::{DEFAULT_HTTP_TIMEOUT, DEFAULT_LISTEN_ADDR};

use clap::{Parser, ValueEnum};
use log::info;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

// argument parser format
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Base URL of the NEAR node RPC, e.g. http://localhost:3030
    #[arg(long, env = "NEAR_RPC_ADDR")]
    pub rpc_addr: String,

    /// Address to serve /metrics on, `host:port` or `:port`
    #[arg(long, env = "LISTEN_ADDR", default_value_t = String::from(DEFAULT_LISTEN_ADDR))]
    pub listen_addr: String,

    /// Timeout in seconds for each request to the node
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// What to do when a scrape produces invalid samples
    #[arg(long, env = "ERROR_HANDLING", value_enum, default_value_t = ErrorHandling::HttpError)]
    pub error_handling: ErrorHandling,
}

/// How the metrics endpoint treats invalid samples.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorHandling {
    /// Answer the whole scrape with 500 and the list of errors
    #[default]
    HttpError,
    /// Log the errors and serve whatever samples are valid
    Continue,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("please specify NEAR_RPC_ADDR")]
    MissingRpcAddr,
    #[error("invalid listen address {addr:?}: {reason}")]
    InvalidListenAddr { addr: String, reason: String },
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_addr: String,
    pub listen_addr: SocketAddr,
    pub http_timeout: Duration,
    pub error_handling: ErrorHandling,
}

impl Config {
    // validate parsed arguments once at startup
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let rpc_addr = args.rpc_addr.trim().to_string();
        if rpc_addr.is_empty() {
            return Err(ConfigError::MissingRpcAddr);
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let config = Config {
            rpc_addr,
            listen_addr: parse_listen_addr(&args.listen_addr)?,
            http_timeout: Duration::from_secs(args.timeout_secs),
            error_handling: args.error_handling,
        };
        info!("Loaded config: {:?}", config);
        Ok(config)
    }
}

// ":8080" listens on every interface
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidListenAddr {
        addr: addr.to_string(),
        reason,
    };

    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|e| invalid(format!("{e}")))?;
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    addr.to_socket_addrs()
        .map_err(|e| invalid(e.to_string()))?
        .next()
        .ok_or_else(|| invalid("no address resolved".to_string()))
}
