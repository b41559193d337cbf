use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

use p3d_relay::config::ServerConfig;
use p3d_relay::core::RelayServer;
use p3d_relay::handlers::routes;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG can come from it
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("No .env file loaded: {}", e),
    }

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, sweep={}s, timeout={}s",
        config.host,
        config.port,
        config.sweep_interval.as_secs(),
        config.client_timeout.as_secs()
    );

    let server = Arc::new(RelayServer::new());
    let _sweeper = server.start_sweeper(config.sweep_interval, config.client_timeout);

    // Build the server address
    let addr: SocketAddr = match config.bind_address().parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("P3D Multiplayer Server running on {}", addr);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };

    let serving = match warp::serve(routes(server)).try_bind_with_graceful_shutdown(addr, shutdown) {
        Ok((_, serving)) => serving,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    serving.await;

    info!("Server stopped");
}
