use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

mod chain;
mod classifier;
mod config;
mod error;
mod probe;
mod report;

use chain::RpcChainClient;
use config::Config;
use probe::ProbeLoop;
use report::HttpReporter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    let filter = if config.verbose_log {
        "ping_probe=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "starting ping probe against {} at {} commitment",
        config.rpc_endpoint,
        config.commitment.as_str()
    );

    let config = Arc::new(config);
    let chain = RpcChainClient::new(&config);
    let reporter = HttpReporter::new(config.va_api_key.clone())?;
    let probe = ProbeLoop::new(Arc::clone(&config), chain, reporter);

    tokio::select! {
        result = probe.run() => result.context("probe loop terminated"),
        _ = shutdown_signal() => {
            info!("caught interrupt signal, exiting");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
