mod collector;
mod constants;
mod http;
mod models;
mod near;
mod prometheus;
mod utils;

use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use crate::collector::NearCollector;
use crate::http::State;
use crate::near::NearRpc;
use crate::utils::{Args, Config};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_args(args)?;

    info!("Starting NEAR validator exporter");
    info!("RPC address: {}", config.rpc_addr);
    info!("Listen address: {}", config.listen_addr);

    let rpc = NearRpc::new(&config.rpc_addr, config.http_timeout)?;

    let state = State {
        config: Arc::new(config),
        collector: Arc::new(NearCollector::new(rpc)),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        info!("Shutting down");
    };

    http::serve(state, shutdown).await?;
    Ok(())
}
